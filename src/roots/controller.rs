//! Motion controller settings: the serial link, the door and the deck layout.
//!
//! Decks are addressed by their hardware number (`Deck[3]`) and their slots
//! by name (`Deck[3].Slot["B"]`). The deck layout is not a flat property; it
//! is persisted by the structured load/store hooks under
//! `<Controller><Decks>` and edited through the `deck-layout` custom editor.

use once_cell::sync::Lazy;
use tracing::warn;

use crate::binding::{
    codec,
    no_indexer,
    parse_bool,
    Catalog,
    ConfigValue,
    Indexer,
    Member,
    PropertyDescriptor,
    Reflect,
    ReflectError,
    ValueKind,
};
use crate::errors::ErrorList;
use crate::registry::{ConfigurationRoot, ObserverList};
use crate::xml::XmlElement;


pub const ROOT_NAME: &str = "Controller";

pub const DEFAULT_DECK_COUNT: u32 = 4;
pub const DEFAULT_SLOT_NAMES: [&str; 3] = ["A", "B", "C"];

pub const BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

const DECK_LAYOUT_GET: &str = "write-deck-layout";
const DECK_LAYOUT_SET: &str = "read-deck-layout";
const BAUD_RATE_PROVIDER: &str = "baud-rates";


static CONTROLLER_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new(
        "ControllerConfiguration",
        vec![
            PropertyDescriptor::new("PortName", ValueKind::Text, "String")
                .config("COM1")
                .display_name("Port name")
                .description("Serial port the motion controller is attached to.")
                .category("Communication"),
            PropertyDescriptor::new("BaudRate", ValueKind::Int, "u32")
                .config("19200")
                .display_name("Baud rate")
                .category("Communication")
                .valid_values(BAUD_RATE_PROVIDER),
            PropertyDescriptor::new("ReadTimeout", ValueKind::Int, "u32")
                .config("5000")
                .display_name("Read timeout")
                .description("Milliseconds to wait for a controller response.")
                .category("Communication"),
            PropertyDescriptor::new("VerboseTracing", ValueKind::Bool, "bool")
                .config("false")
                .display_name("Verbose tracing")
                .category("Diagnostics"),
            PropertyDescriptor::new("DeckCount", ValueKind::Int, "usize")
                .display_name("Deck count")
                .category("Decks")
                .read_only()
                .exclude_type(),
            PropertyDescriptor::new("Door", ValueKind::Object, "DoorSettings")
                .display_name("Door")
                .category("Door")
                .recurse(),
            PropertyDescriptor::new("DeckLayout", ValueKind::Text, "DeckLayout")
                .display_name("Deck layout")
                .category("Decks")
                .custom_editor("deck-layout", Some(DECK_LAYOUT_GET), Some(DECK_LAYOUT_SET)),
            PropertyDescriptor::new("Deck", ValueKind::Object, "Deck").hidden(),
        ],
    )
});

static DOOR_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new(
        "DoorSettings",
        vec![
            PropertyDescriptor::new("OpenTimeout", ValueKind::Int, "u32")
                .config("3000")
                .display_name("Open timeout")
                .description("Milliseconds the door may take to open."),
            PropertyDescriptor::new("SensorEnabled", ValueKind::Bool, "bool")
                .config("true")
                .display_name("Sensor enabled"),
        ],
    )
});

static DECK_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new(
        "Deck",
        vec![
            PropertyDescriptor::new("Number", ValueKind::Int, "u32").read_only(),
            PropertyDescriptor::new("Offset", ValueKind::Int, "i64").config("0"),
            PropertyDescriptor::new("Label", ValueKind::Text, "String").config_without_default(),
            PropertyDescriptor::new("Slot", ValueKind::Object, "Slot").hidden(),
        ],
    )
});

static SLOT_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new(
        "Slot",
        vec![
            PropertyDescriptor::new("Name", ValueKind::Text, "String").read_only(),
            PropertyDescriptor::new("Offset", ValueKind::Int, "i64").config("0"),
            PropertyDescriptor::new("Enabled", ValueKind::Bool, "bool").config("true"),
        ],
    )
});


fn not_assignable(owner: &dyn Reflect, name: &str) -> ReflectError {
    ReflectError::NotAssignable {
        type_name: owner.catalog().type_name(),
        member: name.to_string(),
    }
}

fn not_an_object(owner: &dyn Reflect, name: &str) -> ReflectError {
    ReflectError::NotAnObject {
        type_name: owner.catalog().type_name(),
        member: name.to_string(),
    }
}

fn invalid_value(member: &str, reason: String) -> ReflectError {
    ReflectError::InvalidValue {
        member: member.to_string(),
        reason,
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct DoorSettings {
    pub open_timeout: u32,
    pub sensor_enabled: bool,
}

impl DoorSettings {
    pub fn new() -> Self {
        let mut door = Self {
            open_timeout: 0,
            sensor_enabled: false,
        };
        codec::apply_defaults(&mut door);

        door
    }
}

impl Default for DoorSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl Reflect for DoorSettings {
    fn catalog(&self) -> &'static Catalog {
        &DOOR_CATALOG
    }

    fn get_member(
        &self,
        name: &str,
        index: Option<&Indexer>,
    ) -> Result<Option<Member<'_>>, ReflectError> {
        no_indexer(self, name, index)?;

        let value = match name {
            "OpenTimeout" => ConfigValue::from(self.open_timeout),
            "SensorEnabled" => ConfigValue::from(self.sensor_enabled),
            _ => return Err(self.unknown_member(name)),
        };

        Ok(Some(Member::Value(value)))
    }

    fn set_member(&mut self, name: &str, value: ConfigValue) -> Result<(), ReflectError> {
        match name {
            "OpenTimeout" => self.open_timeout = value.try_into()?,
            "SensorEnabled" => self.sensor_enabled = value.try_into()?,
            _ => return Err(self.unknown_member(name)),
        }

        Ok(())
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub offset: i64,
    pub enabled: bool,
}

impl Slot {
    pub fn new<S: Into<String>>(name: S) -> Self {
        let mut slot = Self {
            name: name.into(),
            offset: 0,
            enabled: false,
        };
        codec::apply_defaults(&mut slot);

        slot
    }
}

impl Reflect for Slot {
    fn catalog(&self) -> &'static Catalog {
        &SLOT_CATALOG
    }

    fn get_member(
        &self,
        name: &str,
        index: Option<&Indexer>,
    ) -> Result<Option<Member<'_>>, ReflectError> {
        no_indexer(self, name, index)?;

        let value = match name {
            "Name" => ConfigValue::from(self.name.as_str()),
            "Offset" => ConfigValue::from(self.offset),
            "Enabled" => ConfigValue::from(self.enabled),
            _ => return Err(self.unknown_member(name)),
        };

        Ok(Some(Member::Value(value)))
    }

    fn set_member(&mut self, name: &str, value: ConfigValue) -> Result<(), ReflectError> {
        match name {
            "Offset" => self.offset = value.try_into()?,
            "Enabled" => self.enabled = value.try_into()?,
            "Name" => return Err(not_assignable(&*self, name)),
            _ => return Err(self.unknown_member(name)),
        }

        Ok(())
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    pub number: u32,
    pub offset: i64,
    pub label: String,
    pub slots: Vec<Slot>,
}

impl Deck {
    pub fn new(number: u32) -> Self {
        let mut deck = Self {
            number,
            offset: 0,
            label: format!("Deck {}", number),
            slots: DEFAULT_SLOT_NAMES.iter().map(|name| Slot::new(*name)).collect(),
        };
        codec::apply_defaults(&mut deck);

        deck
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    fn slot_key<'i>(
        &self,
        name: &str,
        index: Option<&'i Indexer>,
    ) -> Result<&'i str, ReflectError> {
        match index {
            Some(Indexer::Key(key)) => Ok(key.as_str()),
            Some(other) => Err(ReflectError::UnsupportedIndexer {
                type_name: self.catalog().type_name(),
                member: name.to_string(),
                indexer: other.clone(),
            }),
            None => Err(ReflectError::IndexerRequired {
                type_name: self.catalog().type_name(),
                member: name.to_string(),
            }),
        }
    }

    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("Deck")
            .with_attribute("Number", self.number.to_string())
            .with_attribute("Offset", self.offset.to_string())
            .with_attribute("Label", self.label.as_str());

        for slot in &self.slots {
            element.children.push(
                XmlElement::new("Slot")
                    .with_attribute("Name", slot.name.as_str())
                    .with_attribute("Offset", slot.offset.to_string())
                    .with_attribute("Enabled", slot.enabled.to_string()),
            );
        }

        element
    }

    fn from_element(element: &XmlElement) -> Result<Self, ReflectError> {
        let number = required_attribute(element, "Number")?
            .parse::<u32>()
            .map_err(|error| invalid_value("Number", error.to_string()))?;

        let mut deck = Deck::new(number);
        deck.slots.clear();

        if let Some(offset) = element.attribute("Offset") {
            deck.offset = ConfigValue::from(offset).try_into()?;
        }
        if let Some(label) = element.attribute("Label") {
            deck.label = label.to_string();
        }

        for slot_element in element.children_named("Slot") {
            let mut slot = Slot::new(required_attribute(slot_element, "Name")?);

            if let Some(offset) = slot_element.attribute("Offset") {
                slot.offset = ConfigValue::from(offset).try_into()?;
            }
            if let Some(enabled) = slot_element.attribute("Enabled") {
                slot.enabled = parse_bool(enabled).ok_or_else(|| {
                    invalid_value("Enabled", format!("{:?} is not a boolean", enabled))
                })?;
            }

            deck.slots.push(slot);
        }

        Ok(deck)
    }
}

fn required_attribute<'e>(element: &'e XmlElement, name: &str) -> Result<&'e str, ReflectError> {
    element
        .attribute(name)
        .ok_or_else(|| invalid_value(name, format!("<{}> has no {} attribute", element.name, name)))
}

impl Reflect for Deck {
    fn catalog(&self) -> &'static Catalog {
        &DECK_CATALOG
    }

    fn get_member(
        &self,
        name: &str,
        index: Option<&Indexer>,
    ) -> Result<Option<Member<'_>>, ReflectError> {
        if name == "Slot" {
            let key = self.slot_key(name, index)?;
            return Ok(self.slot(key).map(|slot| Member::Object(slot)));
        }

        no_indexer(self, name, index)?;

        let value = match name {
            "Number" => ConfigValue::from(self.number),
            "Offset" => ConfigValue::from(self.offset),
            "Label" => ConfigValue::from(self.label.as_str()),
            _ => return Err(self.unknown_member(name)),
        };

        Ok(Some(Member::Value(value)))
    }

    fn get_member_mut(
        &mut self,
        name: &str,
        index: Option<&Indexer>,
    ) -> Result<Option<&mut dyn Reflect>, ReflectError> {
        if name != "Slot" {
            return Err(not_an_object(&*self, name));
        }

        let key = self.slot_key(name, index)?;
        Ok(self
            .slots
            .iter_mut()
            .find(|slot| slot.name == key)
            .map(|slot| slot as &mut dyn Reflect))
    }

    fn set_member(&mut self, name: &str, value: ConfigValue) -> Result<(), ReflectError> {
        match name {
            "Offset" => self.offset = value.try_into()?,
            "Label" => self.label = value.try_into()?,
            "Number" | "Slot" => return Err(not_assignable(&*self, name)),
            _ => return Err(self.unknown_member(name)),
        }

        Ok(())
    }
}


#[derive(Debug)]
pub struct ControllerConfiguration {
    pub port_name: String,
    pub baud_rate: u32,
    pub read_timeout: u32,
    pub verbose_tracing: bool,

    /// `None` on hardware without a door.
    pub door: Option<DoorSettings>,
    pub decks: Vec<Deck>,

    observers: ObserverList,
}

impl ControllerConfiguration {
    pub fn new() -> Self {
        let mut configuration = Self {
            port_name: String::new(),
            baud_rate: 0,
            read_timeout: 0,
            verbose_tracing: false,
            door: Some(DoorSettings::new()),
            decks: (1..=DEFAULT_DECK_COUNT).map(Deck::new).collect(),
            observers: ObserverList::new(),
        };
        codec::apply_defaults(&mut configuration);

        configuration
    }

    pub fn without_door() -> Self {
        Self {
            door: None,
            ..Self::new()
        }
    }

    pub fn deck(&self, number: u32) -> Option<&Deck> {
        self.decks.iter().find(|deck| deck.number == number)
    }

    fn deck_number(&self, name: &str, index: Option<&Indexer>) -> Result<u64, ReflectError> {
        match index {
            Some(Indexer::Position(number)) => Ok(*number),
            Some(other) => Err(ReflectError::UnsupportedIndexer {
                type_name: self.catalog().type_name(),
                member: name.to_string(),
                indexer: other.clone(),
            }),
            None => Err(ReflectError::IndexerRequired {
                type_name: self.catalog().type_name(),
                member: name.to_string(),
            }),
        }
    }

    fn deck_layout_summary(&self) -> String {
        self.decks
            .iter()
            .map(|deck| format!("{}:{}", deck.number, deck.offset))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn write_deck_layout(&self, node: &mut XmlElement) {
        for deck in &self.decks {
            let mut deck_node = XmlElement::new("deck")
                .with_attribute("number", deck.number.to_string())
                .with_attribute("offset", deck.offset.to_string())
                .with_attribute("label", deck.label.as_str());

            for slot in &deck.slots {
                deck_node.children.push(
                    XmlElement::new("slot")
                        .with_attribute("name", slot.name.as_str())
                        .with_attribute("offset", slot.offset.to_string())
                        .with_attribute("enabled", slot.enabled.to_string()),
                );
            }

            node.children.push(deck_node);
        }
    }

    /// Accepts either `<deck>` children as written by the getter or the
    /// `number:offset,...` summary as plain text.
    fn read_deck_layout(&mut self, node: &XmlElement) -> Result<(), ReflectError> {
        if node.children.is_empty() {
            return self.read_deck_layout_summary(node.inner_text().trim());
        }

        for deck_node in node.children_named("deck") {
            let number = required_attribute(deck_node, "number")?
                .parse::<u32>()
                .map_err(|error| invalid_value("number", error.to_string()))?;

            let Some(deck) = self.decks.iter_mut().find(|deck| deck.number == number) else {
                warn!(number, "Deck layout update names a deck that doesn't exist.");
                continue;
            };

            if let Some(offset) = deck_node.attribute("offset") {
                deck.offset = ConfigValue::from(offset).try_into()?;
            }
            if let Some(label) = deck_node.attribute("label") {
                deck.label = label.to_string();
            }

            for slot_node in deck_node.children_named("slot") {
                let name = required_attribute(slot_node, "name")?;
                let Some(slot) = deck.slots.iter_mut().find(|slot| slot.name == name) else {
                    warn!(
                        number,
                        slot = name,
                        "Deck layout update names a slot that doesn't exist."
                    );
                    continue;
                };

                if let Some(offset) = slot_node.attribute("offset") {
                    slot.offset = ConfigValue::from(offset).try_into()?;
                }
                if let Some(enabled) = slot_node.attribute("enabled") {
                    slot.enabled = ConfigValue::from(enabled).try_into()?;
                }
            }
        }

        Ok(())
    }

    fn read_deck_layout_summary(&mut self, summary: &str) -> Result<(), ReflectError> {
        for entry in summary.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (number, offset) = entry.split_once(':').ok_or_else(|| {
                invalid_value("DeckLayout", format!("{:?} is not number:offset", entry))
            })?;
            let number = number
                .trim()
                .parse::<u32>()
                .map_err(|error| invalid_value("DeckLayout", error.to_string()))?;

            let Some(deck) = self.decks.iter_mut().find(|deck| deck.number == number) else {
                warn!(number, "Deck layout summary names a deck that doesn't exist.");
                continue;
            };

            deck.offset = ConfigValue::from(offset).try_into()?;
        }

        Ok(())
    }
}

impl Default for ControllerConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl Reflect for ControllerConfiguration {
    fn catalog(&self) -> &'static Catalog {
        &CONTROLLER_CATALOG
    }

    fn get_member(
        &self,
        name: &str,
        index: Option<&Indexer>,
    ) -> Result<Option<Member<'_>>, ReflectError> {
        if name == "Deck" {
            let number = self.deck_number(name, index)?;
            return Ok(self
                .decks
                .iter()
                .find(|deck| u64::from(deck.number) == number)
                .map(|deck| Member::Object(deck)));
        }

        no_indexer(self, name, index)?;

        let value = match name {
            "PortName" => ConfigValue::from(self.port_name.as_str()),
            "BaudRate" => ConfigValue::from(self.baud_rate),
            "ReadTimeout" => ConfigValue::from(self.read_timeout),
            "VerboseTracing" => ConfigValue::from(self.verbose_tracing),
            "DeckCount" => ConfigValue::from(self.decks.len() as u64),
            "DeckLayout" => ConfigValue::from(self.deck_layout_summary()),
            "Door" => return Ok(self.door.as_ref().map(|door| Member::Object(door))),
            _ => return Err(self.unknown_member(name)),
        };

        Ok(Some(Member::Value(value)))
    }

    fn get_member_mut(
        &mut self,
        name: &str,
        index: Option<&Indexer>,
    ) -> Result<Option<&mut dyn Reflect>, ReflectError> {
        match name {
            "Door" => {
                no_indexer(&*self, name, index)?;
                Ok(self.door.as_mut().map(|door| door as &mut dyn Reflect))
            }
            "Deck" => {
                let number = self.deck_number(name, index)?;
                Ok(self
                    .decks
                    .iter_mut()
                    .find(|deck| u64::from(deck.number) == number)
                    .map(|deck| deck as &mut dyn Reflect))
            }
            _ => Err(not_an_object(&*self, name)),
        }
    }

    fn set_member(&mut self, name: &str, value: ConfigValue) -> Result<(), ReflectError> {
        match name {
            "PortName" => self.port_name = value.try_into()?,
            "BaudRate" => {
                let baud_rate: u32 = value.try_into()?;
                if !BAUD_RATES.contains(&baud_rate) {
                    return Err(invalid_value(
                        name,
                        format!("{} is not a supported baud rate", baud_rate),
                    ));
                }
                self.baud_rate = baud_rate;
            }
            "ReadTimeout" => self.read_timeout = value.try_into()?,
            "VerboseTracing" => self.verbose_tracing = value.try_into()?,
            "DeckCount" | "DeckLayout" | "Door" | "Deck" => {
                return Err(not_assignable(&*self, name));
            }
            _ => return Err(self.unknown_member(name)),
        }

        Ok(())
    }

    fn custom_editor_get(&self, hook: &str, node: &mut XmlElement) -> Result<(), ReflectError> {
        match hook {
            DECK_LAYOUT_GET => {
                self.write_deck_layout(node);
                Ok(())
            }
            _ => Err(self.unknown_hook(hook)),
        }
    }

    fn custom_editor_set(&mut self, hook: &str, node: &XmlElement) -> Result<(), ReflectError> {
        match hook {
            DECK_LAYOUT_SET => self.read_deck_layout(node),
            _ => Err(self.unknown_hook(hook)),
        }
    }

    fn valid_values(&self, provider: &str) -> Result<Vec<String>, ReflectError> {
        match provider {
            BAUD_RATE_PROVIDER => Ok(BAUD_RATES.iter().map(u32::to_string).collect()),
            _ => Err(self.unknown_hook(provider)),
        }
    }
}

impl ConfigurationRoot for ControllerConfiguration {
    fn root_name(&self) -> &str {
        ROOT_NAME
    }

    fn observers(&self) -> &ObserverList {
        &self.observers
    }

    fn observers_mut(&mut self) -> &mut ObserverList {
        &mut self.observers
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn load_properties_inner(&mut self, document: &XmlElement, _errors: &mut ErrorList) {
        let Some(controller) = document.child(ROOT_NAME) else {
            return;
        };

        if let (Some(door), Some(subtree)) = (self.door.as_mut(), controller.child("Door")) {
            codec::load_properties(door, subtree);
        }

        let Some(decks) = controller.child("Decks") else {
            return;
        };

        let mut loaded = Vec::new();
        for element in decks.children_named("Deck") {
            match Deck::from_element(element) {
                Ok(deck) => loaded.push(deck),
                Err(error) => warn!(%error, "Skipping unreadable deck definition."),
            }
        }

        if !loaded.is_empty() {
            self.decks = loaded;
        }
    }

    fn store_properties_inner(&self, document: &mut XmlElement, _errors: &mut ErrorList) {
        let controller = document.ensure_child(ROOT_NAME);

        if let Some(door) = &self.door {
            codec::store_properties(door, controller.ensure_child("Door"));
        }

        let decks = controller.ensure_child("Decks");
        decks.text = None;
        decks.children = self.decks.iter().map(Deck::to_element).collect();
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_come_from_the_catalog() {
        let controller = ControllerConfiguration::new();

        assert_eq!(controller.port_name, "COM1");
        assert_eq!(controller.baud_rate, 19200);
        assert_eq!(controller.read_timeout, 5000);
        assert!(!controller.verbose_tracing);
        assert_eq!(
            controller.door,
            Some(DoorSettings {
                open_timeout: 3000,
                sensor_enabled: true
            })
        );
        assert_eq!(controller.decks.len(), DEFAULT_DECK_COUNT as usize);
        assert_eq!(controller.deck(2).unwrap().label, "Deck 2");
        assert!(controller.deck(2).unwrap().slot("B").unwrap().enabled);
    }

    #[test]
    fn catalogs_are_consistent() {
        let controller = ControllerConfiguration::new();
        let deck = &controller.decks[0];

        assert!(controller.catalog().validate().is_empty());
        assert!(deck.catalog().validate().is_empty());
        assert!(deck.slots[0].catalog().validate().is_empty());
        assert!(controller.door.as_ref().unwrap().catalog().validate().is_empty());
    }

    #[test]
    fn unsupported_baud_rates_are_rejected() {
        let mut controller = ControllerConfiguration::new();

        let result = controller.set_member("BaudRate", ConfigValue::Int(12345));

        assert!(matches!(result, Err(ReflectError::InvalidValue { .. })));
        assert_eq!(controller.baud_rate, 19200);
    }

    #[test]
    fn decks_round_trip_through_their_elements() {
        let mut deck = Deck::new(3);
        deck.offset = -40;
        deck.slots[1].enabled = false;

        let parsed = Deck::from_element(&deck.to_element()).unwrap();

        assert_eq!(parsed, deck);
    }

    #[test]
    fn deck_indexers_must_be_positional() {
        let controller = ControllerConfiguration::new();
        let key = Indexer::Key("2".to_string());

        assert!(matches!(
            controller.get_member("Deck", Some(&key)),
            Err(ReflectError::UnsupportedIndexer { .. })
        ));
        assert!(matches!(
            controller.get_member("Deck", None),
            Err(ReflectError::IndexerRequired { .. })
        ));
    }
}
