//! Service-wide settings and the upgrade of the legacy poll rate.

use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::binding::{
    codec,
    no_indexer,
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
use crate::registry::{ConfigurationRoot, MigrationError, ObserverList};
use crate::xml::XmlElement;


pub const ROOT_NAME: &str = "Service";

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Element name used for the heartbeat interval before it was renamed.
pub const LEGACY_POLL_RATE: &str = "PollRate";

const LOG_LEVEL_PROVIDER: &str = "log-levels";


static SERVICE_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new(
        "ServiceConfiguration",
        vec![
            PropertyDescriptor::new("LogLevel", ValueKind::Text, "String")
                .config("info")
                .display_name("Log level")
                .category("Diagnostics")
                .valid_values(LOG_LEVEL_PROVIDER),
            PropertyDescriptor::new("HeartbeatInterval", ValueKind::Int, "u32")
                .config("30000")
                .display_name("Heartbeat interval")
                .description("Milliseconds between two service heartbeats.")
                .category("Service"),
            PropertyDescriptor::new("StartupDelay", ValueKind::Float, "f64")
                .config("2.5")
                .display_name("Startup delay")
                .description("Seconds to wait for the hardware after power-up.")
                .category("Service"),
            PropertyDescriptor::new("RemoteManagement", ValueKind::Bool, "bool")
                .config("true")
                .display_name("Remote management")
                .category("Service"),
            PropertyDescriptor::new("Maintenance", ValueKind::Bool, "bool")
                .config("false")
                .display_name("Maintenance mode")
                .category("Service"),
            PropertyDescriptor::new("Version", ValueKind::Text, "String")
                .display_name("Version")
                .read_only()
                .exclude_type(),
        ],
    )
});


#[derive(Debug)]
pub struct ServiceConfiguration {
    pub log_level: String,
    pub heartbeat_interval: u32,
    pub startup_delay: f64,
    pub remote_management: bool,
    pub maintenance: bool,

    observers: ObserverList,
}

impl ServiceConfiguration {
    pub fn new() -> Self {
        let mut configuration = Self {
            log_level: String::new(),
            heartbeat_interval: 0,
            startup_delay: 0.0,
            remote_management: false,
            maintenance: false,
            observers: ObserverList::new(),
        };
        codec::apply_defaults(&mut configuration);

        configuration
    }
}

impl Default for ServiceConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl Reflect for ServiceConfiguration {
    fn catalog(&self) -> &'static Catalog {
        &SERVICE_CATALOG
    }

    fn get_member(
        &self,
        name: &str,
        index: Option<&Indexer>,
    ) -> Result<Option<Member<'_>>, ReflectError> {
        no_indexer(self, name, index)?;

        let value = match name {
            "LogLevel" => ConfigValue::from(self.log_level.as_str()),
            "HeartbeatInterval" => ConfigValue::from(self.heartbeat_interval),
            "StartupDelay" => ConfigValue::from(self.startup_delay),
            "RemoteManagement" => ConfigValue::from(self.remote_management),
            "Maintenance" => ConfigValue::from(self.maintenance),
            "Version" => ConfigValue::from(env!("CARGO_PKG_VERSION")),
            _ => return Err(self.unknown_member(name)),
        };

        Ok(Some(Member::Value(value)))
    }

    fn set_member(&mut self, name: &str, value: ConfigValue) -> Result<(), ReflectError> {
        match name {
            "LogLevel" => {
                let level = String::try_from(value)?.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(ReflectError::InvalidValue {
                        member: name.to_string(),
                        reason: format!("{:?} is not a log level", level),
                    });
                }
                self.log_level = level;
            }
            "HeartbeatInterval" => self.heartbeat_interval = value.try_into()?,
            "StartupDelay" => self.startup_delay = value.try_into()?,
            "RemoteManagement" => self.remote_management = value.try_into()?,
            "Maintenance" => self.maintenance = value.try_into()?,
            "Version" => {
                return Err(ReflectError::NotAssignable {
                    type_name: self.catalog().type_name(),
                    member: name.to_string(),
                });
            }
            _ => return Err(self.unknown_member(name)),
        }

        Ok(())
    }

    fn valid_values(&self, provider: &str) -> Result<Vec<String>, ReflectError> {
        match provider {
            LOG_LEVEL_PROVIDER => Ok(LOG_LEVELS.iter().map(|level| level.to_string()).collect()),
            _ => Err(self.unknown_hook(provider)),
        }
    }
}

impl ConfigurationRoot for ServiceConfiguration {
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

    fn import(&mut self, _errors: &mut ErrorList) -> Result<(), MigrationError> {
        debug!("Service configuration has nothing to import.");
        Ok(())
    }

    /// Renames the legacy `PollRate` leaf to `HeartbeatInterval`. A document
    /// that already has a `HeartbeatInterval` keeps it and loses the legacy leaf.
    fn upgrade(
        &mut self,
        document: &mut XmlElement,
        _errors: &mut ErrorList,
    ) -> Result<(), MigrationError> {
        let Some(service) = document.child_mut(ROOT_NAME) else {
            debug!("Backing document has no service subtree, nothing to upgrade.");
            return Ok(());
        };

        let Some(position) = service
            .children
            .iter()
            .position(|child| child.name == LEGACY_POLL_RATE)
        else {
            return Ok(());
        };

        let legacy = service.children.remove(position);
        let poll_rate = legacy.inner_text();
        if let Err(error) = poll_rate.trim().parse::<u32>() {
            return Err(MigrationError::Failed(format!(
                "{} {:?} is not a number: {}",
                LEGACY_POLL_RATE, poll_rate, error
            )));
        }

        if service.child("HeartbeatInterval").is_none() {
            info!(poll_rate = %poll_rate, "Upgraded legacy poll rate to heartbeat interval.");
            service
                .children
                .push(XmlElement::new("HeartbeatInterval").with_text(poll_rate.trim()));
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_come_from_the_catalog() {
        let service = ServiceConfiguration::new();

        assert_eq!(service.log_level, "info");
        assert_eq!(service.heartbeat_interval, 30000);
        assert_eq!(service.startup_delay, 2.5);
        assert!(service.remote_management);
        assert!(!service.maintenance);
        assert!(service.catalog().validate().is_empty());
    }

    #[test]
    fn log_levels_are_validated() {
        let mut service = ServiceConfiguration::new();

        service
            .set_member("LogLevel", ConfigValue::from("DEBUG"))
            .unwrap();
        assert_eq!(service.log_level, "debug");

        assert!(service
            .set_member("LogLevel", ConfigValue::from("verbose"))
            .is_err());
        assert_eq!(service.log_level, "debug");
    }

    #[test]
    fn upgrade_renames_the_poll_rate() {
        let mut service = ServiceConfiguration::new();
        let mut document = XmlElement::parse(
            "<Configuration><Service><PollRate>1500</PollRate></Service></Configuration>",
        )
        .unwrap();

        service.upgrade(&mut document, &mut ErrorList::new()).unwrap();

        let subtree = document.child(ROOT_NAME).unwrap();
        assert!(subtree.child(LEGACY_POLL_RATE).is_none());
        assert_eq!(subtree.child("HeartbeatInterval").unwrap().inner_text(), "1500");
    }

    #[test]
    fn upgrade_rejects_unreadable_poll_rates() {
        let mut service = ServiceConfiguration::new();
        let mut document = XmlElement::parse(
            "<Configuration><Service><PollRate>soon</PollRate></Service></Configuration>",
        )
        .unwrap();

        let result = service.upgrade(&mut document, &mut ErrorList::new());

        assert!(matches!(result, Err(MigrationError::Failed(_))));
    }
}
