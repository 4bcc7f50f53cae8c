use hwconf::binding::codec::{self, MAX_DEPTH};
use hwconf::binding::{
    check_members,
    no_indexer,
    resolve_for_read,
    resolve_for_write,
    Catalog,
    ConfigValue,
    Indexer,
    Member,
    PropertyDescriptor,
    Reflect,
    ReflectError,
    ValueKind,
};
use hwconf::roots::controller::{BAUD_RATES, DEFAULT_DECK_COUNT};
use hwconf::roots::{ControllerConfiguration, ServiceConfiguration};
use hwconf::xml::XmlElement;
use once_cell::sync::Lazy;
use pretty_assertions::assert_eq;


static LINK_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new(
        "Link",
        vec![
            PropertyDescriptor::new("Position", ValueKind::Int, "usize").config("0"),
            PropertyDescriptor::new("Next", ValueKind::Object, "Link").recurse(),
        ],
    )
});


/// A linked list deep enough to outgrow the export nesting limit.
struct Link {
    position: usize,
    next: Option<Box<Link>>,
}

impl Link {
    fn chain(length: usize) -> Link {
        let mut head = Link {
            position: length - 1,
            next: None,
        };

        for position in (0..length - 1).rev() {
            head = Link {
                position,
                next: Some(Box::new(head)),
            };
        }

        head
    }
}

impl Reflect for Link {
    fn catalog(&self) -> &'static Catalog {
        &LINK_CATALOG
    }

    fn get_member(
        &self,
        name: &str,
        index: Option<&Indexer>,
    ) -> Result<Option<Member<'_>>, ReflectError> {
        no_indexer(self, name, index)?;

        match name {
            "Position" => Ok(Some(Member::Value(ConfigValue::from(self.position as u64)))),
            "Next" => Ok(self.next.as_deref().map(|next| Member::Object(next))),
            _ => Err(self.unknown_member(name)),
        }
    }

    fn set_member(&mut self, name: &str, value: ConfigValue) -> Result<(), ReflectError> {
        match name {
            "Position" => self.position = u64::try_from(value)? as usize,
            _ => return Err(self.unknown_member(name)),
        }

        Ok(())
    }
}


static GAUGE_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new(
        "Gauge",
        vec![
            PropertyDescriptor::new("Reading", ValueKind::Int, "i32").config("0"),
            PropertyDescriptor::new("Unit", ValueKind::Text, "String").config("bar"),
            PropertyDescriptor::new("Calibrated", ValueKind::Bool, "bool").config("false"),
        ],
    )
});


/// A type whose member access has fallen behind its catalog: `Unit` is never
/// matched and `Calibrated` can be read but not assigned.
struct Gauge {
    reading: i32,
    calibrated: bool,
}

impl Reflect for Gauge {
    fn catalog(&self) -> &'static Catalog {
        &GAUGE_CATALOG
    }

    fn get_member(
        &self,
        name: &str,
        index: Option<&Indexer>,
    ) -> Result<Option<Member<'_>>, ReflectError> {
        no_indexer(self, name, index)?;

        match name {
            "Reading" => Ok(Some(Member::Value(ConfigValue::from(self.reading)))),
            "Calibrated" => Ok(Some(Member::Value(ConfigValue::from(self.calibrated)))),
            _ => Err(self.unknown_member(name)),
        }
    }

    fn set_member(&mut self, name: &str, value: ConfigValue) -> Result<(), ReflectError> {
        match name {
            "Reading" => self.reading = value.try_into()?,
            _ => return Err(self.unknown_member(name)),
        }

        Ok(())
    }
}


fn value_at(controller: &ControllerConfiguration, path: &str) -> Option<ConfigValue> {
    resolve_for_read(path, controller)?.into_value()
}

fn exported(controller: &ControllerConfiguration) -> XmlElement {
    let text = codec::format_object_as_xml(controller, "Controller").unwrap();
    XmlElement::parse(&text).unwrap()
}

fn property<'a>(parent: &'a XmlElement, name: &str) -> &'a XmlElement {
    parent
        .children_named(codec::PROPERTY)
        .find(|node| node.attribute(codec::NAME) == Some(name))
        .unwrap()
}


#[test]
fn indexed_paths_match_direct_field_access() {
    let mut controller = ControllerConfiguration::new();
    controller.decks[1].label = "Reagents".to_string();

    assert_eq!(
        value_at(&controller, "Deck[2].Label"),
        Some(ConfigValue::from(controller.deck(2).unwrap().label.as_str()))
    );
    assert_eq!(
        value_at(&controller, r#"Deck[2].Slot["C"].Enabled"#),
        Some(ConfigValue::Bool(true))
    );
    assert_eq!(value_at(&controller, "Door.OpenTimeout"), Some(ConfigValue::Int(3000)));
    assert_eq!(
        value_at(&controller, "DeckCount"),
        Some(ConfigValue::Int(i64::from(DEFAULT_DECK_COUNT)))
    );
}

#[test]
fn unresolvable_paths_are_absent() {
    let controller = ControllerConfiguration::without_door();

    assert!(value_at(&controller, "Deck[99].Label").is_none());
    assert!(value_at(&controller, r#"Deck["2"].Label"#).is_none());
    assert!(value_at(&controller, r#"Deck[2].Slot["Z"].Offset"#).is_none());
    assert!(value_at(&controller, "Deck.Label").is_none());
    assert!(value_at(&controller, "Door.OpenTimeout").is_none());
    assert!(value_at(&controller, "PortName.Length").is_none());
    assert!(value_at(&controller, "Nothing").is_none());
    assert!(value_at(&controller, "Deck[2").is_none());
}

#[test]
fn object_members_resolve_to_objects() {
    let controller = ControllerConfiguration::new();

    let member = resolve_for_read("Deck[3]", &controller).unwrap();

    assert!(member.value().is_none());
    assert_eq!(member.object().unwrap().catalog().type_name(), "Deck");
}

#[test]
fn writes_convert_to_the_declared_kind() {
    let mut controller = ControllerConfiguration::new();

    assert!(resolve_for_write("BaudRate", &mut controller, ConfigValue::from("9600")));
    assert!(resolve_for_write(
        r#"Deck[4].Slot["A"].Offset"#,
        &mut controller,
        ConfigValue::Float(12.0)
    ));
    assert!(resolve_for_write(
        "PortName",
        &mut controller,
        ConfigValue::List(vec![ConfigValue::from("COM7")])
    ));

    assert_eq!(controller.baud_rate, 9600);
    assert_eq!(controller.deck(4).unwrap().slot("A").unwrap().offset, 12);
    assert_eq!(controller.port_name, "COM7");
}

#[test]
fn invalid_writes_are_dropped() {
    let mut controller = ControllerConfiguration::new();

    assert!(!resolve_for_write("DeckCount", &mut controller, ConfigValue::Int(2)));
    assert!(!resolve_for_write("Deck[1].Number", &mut controller, ConfigValue::Int(7)));
    assert!(!resolve_for_write("Deck[9].Offset", &mut controller, ConfigValue::Int(1)));
    assert!(!resolve_for_write("BaudRate", &mut controller, ConfigValue::from("fast")));
    assert!(!resolve_for_write("BaudRate", &mut controller, ConfigValue::Int(1234)));
    assert!(!resolve_for_write(
        "ReadTimeout",
        &mut controller,
        ConfigValue::List(vec![ConfigValue::Int(1), ConfigValue::Int(2)])
    ));
    assert!(!resolve_for_write("Deck[1]", &mut controller, ConfigValue::Int(1)));

    let mut doorless = ControllerConfiguration::without_door();
    assert!(!resolve_for_write("Door.OpenTimeout", &mut doorless, ConfigValue::Int(1)));
    assert!(doorless.door.is_none());

    assert_eq!(controller.baud_rate, 19200);
    assert_eq!(controller.deck(1).unwrap().number, 1);
}

#[test]
fn export_describes_every_browsable_member() {
    let controller = ControllerConfiguration::new();
    let tree = exported(&controller);

    assert_eq!(tree.name, "Controller");
    let names = tree
        .children_named(codec::PROPERTY)
        .filter_map(|node| node.attribute(codec::NAME))
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "PortName",
            "BaudRate",
            "ReadTimeout",
            "VerboseTracing",
            "DeckCount",
            "Door",
            "DeckLayout"
        ]
    );

    let port_name = property(&tree, "PortName");
    assert_eq!(port_name.attribute(codec::DISPLAY_NAME), Some("Port name"));
    assert_eq!(port_name.attribute(codec::CATEGORY), Some("Communication"));
    assert_eq!(port_name.attribute(codec::READ_ONLY), Some("false"));
    assert_eq!(port_name.attribute(codec::VALUE), Some("COM1"));
    assert_eq!(port_name.attribute(codec::TYPE), Some("String"));

    let deck_count = property(&tree, "DeckCount");
    assert_eq!(deck_count.attribute(codec::READ_ONLY), Some("true"));
    assert_eq!(deck_count.attribute(codec::TYPE), None);
}

#[test]
fn export_writes_the_current_value_as_default_value() {
    let mut controller = ControllerConfiguration::new();
    controller.read_timeout = 750;

    let tree = exported(&controller);
    let read_timeout = property(&tree, "ReadTimeout");

    assert_eq!(read_timeout.attribute(codec::VALUE), Some("750"));
    assert_eq!(read_timeout.attribute(codec::DEFAULT_VALUE), Some("750"));
}

#[test]
fn export_lists_valid_values_with_their_count() {
    let tree = exported(&ControllerConfiguration::new());
    let baud_rate = property(&tree, "BaudRate");

    let valid_values = baud_rate
        .children_named(codec::VALID)
        .filter_map(|node| node.attribute(codec::VALUE))
        .collect::<Vec<_>>();

    assert_eq!(
        baud_rate.attribute(codec::VALID_VALUE_COUNT),
        Some(BAUD_RATES.len().to_string().as_str())
    );
    assert_eq!(valid_values, vec!["9600", "19200", "38400", "57600", "115200"]);
}

#[test]
fn export_recurses_into_present_sub_objects_only() {
    let tree = exported(&ControllerConfiguration::new());
    let door = property(&tree, "Door");

    assert_eq!(door.attribute(codec::TYPE), Some("DoorSettings"));
    assert_eq!(door.attribute(codec::VALUE), None);
    assert_eq!(property(door, "OpenTimeout").attribute(codec::VALUE), Some("3000"));

    let tree = exported(&ControllerConfiguration::without_door());
    let door = property(&tree, "Door");

    assert_eq!(door.children_named(codec::PROPERTY).count(), 0);
}

#[test]
fn custom_editors_replace_the_value_logic() {
    let tree = exported(&ControllerConfiguration::new());
    let layout = property(&tree, "DeckLayout");

    assert_eq!(layout.attribute(codec::CUSTOM_EDITOR), Some("deck-layout"));
    assert_eq!(layout.attribute(codec::VALUE), None);
    assert_eq!(layout.attribute(codec::TYPE), None);
    assert_eq!(
        layout.children_named("deck").count(),
        DEFAULT_DECK_COUNT as usize
    );
}

#[test]
fn import_of_an_export_reproduces_persisted_values() {
    let mut source = ControllerConfiguration::new();
    source.port_name = "COM4".to_string();
    source.baud_rate = 57600;
    source.verbose_tracing = true;
    source.door.as_mut().unwrap().sensor_enabled = false;
    source.decks[0].offset = 300;
    source.decks[0].label = "Samples".to_string();
    source.decks[1].slots[0].offset = 42;
    source.decks[1].slots[2].enabled = false;

    let tree = exported(&source);
    let mut target = ControllerConfiguration::new();
    codec::update_object_from_xml(&mut target, &tree);

    assert_eq!(target.port_name, source.port_name);
    assert_eq!(target.baud_rate, source.baud_rate);
    assert_eq!(target.read_timeout, source.read_timeout);
    assert_eq!(target.verbose_tracing, source.verbose_tracing);
    assert_eq!(target.door, source.door);
    assert_eq!(target.decks, source.decks);
}

#[test]
fn custom_editors_accept_text_content() {
    let mut controller = ControllerConfiguration::new();
    let update = XmlElement::parse(
        r#"<Controller>
            <property name="DeckLayout" custom-editor="deck-layout">1:20, 3:-15</property>
        </Controller>"#,
    )
    .unwrap();

    codec::update_object_from_xml(&mut controller, &update);

    assert_eq!(controller.deck(1).unwrap().offset, 20);
    assert_eq!(controller.deck(2).unwrap().offset, 0);
    assert_eq!(controller.deck(3).unwrap().offset, -15);
}

#[test]
fn updates_never_create_sub_objects() {
    let mut controller = ControllerConfiguration::without_door();
    let update = XmlElement::parse(
        r#"<Controller>
            <property name="Door">
                <property name="OpenTimeout" value="10"/>
            </property>
            <property name="ReadTimeout" value="100"/>
        </Controller>"#,
    )
    .unwrap();

    codec::update_object_from_xml(&mut controller, &update);

    assert!(controller.door.is_none());
    assert_eq!(controller.read_timeout, 100);
}

#[test]
fn one_failing_member_does_not_stop_an_update() {
    let mut service = ServiceConfiguration::new();
    let update = XmlElement::parse(
        r#"<Service>
            <property name="LogLevel" value="chatty"/>
            <property name="Unknown" value="1"/>
            <property name="HeartbeatInterval" value="soon"/>
            <property name="StartupDelay" value="0.75"/>
            <property name="Maintenance" value="TRUE"/>
        </Service>"#,
    )
    .unwrap();

    codec::update_object_from_xml(&mut service, &update);

    assert_eq!(service.log_level, "info");
    assert_eq!(service.heartbeat_interval, 30000);
    assert_eq!(service.startup_delay, 0.75);
    assert!(service.maintenance);
}

#[test]
fn flat_properties_round_trip_through_a_document_subtree() {
    let mut source = ServiceConfiguration::new();
    source.heartbeat_interval = 1000;
    source.remote_management = false;

    let mut subtree = XmlElement::new("Service");
    codec::store_properties(&source, &mut subtree);

    assert_eq!(
        subtree.child("RemoteManagement").unwrap().inner_text(),
        "false"
    );
    assert!(subtree.child("Version").is_none());

    let mut target = ServiceConfiguration::new();
    codec::load_properties(&mut target, &subtree);

    assert_eq!(target.heartbeat_interval, 1000);
    assert!(!target.remote_management);
    assert_eq!(target.log_level, source.log_level);
}

#[test]
fn member_checks_find_catalog_entries_without_accessors() {
    let mut gauge = Gauge {
        reading: 4,
        calibrated: true,
    };

    let problems = check_members(&mut gauge)
        .into_iter()
        .map(|problem| problem.to_string())
        .collect::<Vec<_>>();

    assert_eq!(
        problems,
        vec![
            "Gauge.Unit is declared but get_member doesn't know it",
            "Gauge.Calibrated is writable but set_member can't assign it",
        ]
    );
    assert_eq!(gauge.reading, 4);
}

#[test]
fn built_in_roots_pass_the_member_checks() {
    let mut controller = ControllerConfiguration::new();
    let mut service = ServiceConfiguration::new();

    assert!(check_members(&mut controller).is_empty());
    assert!(check_members(&mut controller.decks[0]).is_empty());
    assert!(check_members(&mut controller.decks[0].slots[0]).is_empty());
    assert!(check_members(controller.door.as_mut().unwrap()).is_empty());
    assert!(check_members(&mut service).is_empty());
}

#[test]
fn export_stops_at_the_nesting_limit() {
    let chain = Link::chain(MAX_DEPTH + 8);
    let text = codec::format_object_as_xml(&chain, "Chain").unwrap();
    let tree = XmlElement::parse(&text).unwrap();

    let mut nested_levels = 0;
    let mut level = &tree;
    loop {
        let next = property(level, "Next");
        if next.children_named(codec::PROPERTY).next().is_none() {
            break;
        }
        nested_levels += 1;
        level = next;
    }

    assert_eq!(nested_levels, MAX_DEPTH);
}
