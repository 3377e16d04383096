//! Resource kind descriptors.

use crate::model::resource::TypeMeta;
use std::fmt::{Display, Formatter};

/// API group of notification resources.
pub const NOTIFICATIONS_GROUP: &str = "notifications.alerting.grafana.app";
/// API version of notification resources.
pub const NOTIFICATIONS_VERSION: &str = "v0alpha1";

/// Static description of one served resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceInfo {
    pub group: &'static str,
    pub version: &'static str,
    /// Plural, lower-case resource name used in paths and storage keys.
    pub resource: &'static str,
    pub singular: &'static str,
    pub kind: &'static str,
}

/// Group-qualified resource name, e.g. `templates.notifications.alerting.grafana.app`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupResource {
    pub group: &'static str,
    pub resource: &'static str,
}

impl Display for GroupResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.group.is_empty() {
            f.write_str(self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

impl ResourceInfo {
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }

    pub fn type_meta(&self) -> TypeMeta {
        TypeMeta {
            api_version: self.api_version(),
            kind: self.kind.to_string(),
        }
    }

    pub fn group_resource(&self) -> GroupResource {
        GroupResource {
            group: self.group,
            resource: self.resource,
        }
    }

    pub fn singular_group_resource(&self) -> GroupResource {
        GroupResource {
            group: self.group,
            resource: self.singular,
        }
    }
}

/// Descriptor of the notification `Template` resource.
pub const fn templates_resource_info() -> ResourceInfo {
    ResourceInfo {
        group: NOTIFICATIONS_GROUP,
        version: NOTIFICATIONS_VERSION,
        resource: "templates",
        singular: "template",
        kind: "Template",
    }
}

#[cfg(test)]
mod tests {
    use super::templates_resource_info;

    #[test]
    fn templates_descriptor_renders_api_version_and_group_resource() {
        let info = templates_resource_info();
        assert_eq!(
            info.api_version(),
            "notifications.alerting.grafana.app/v0alpha1"
        );
        assert_eq!(
            info.group_resource().to_string(),
            "templates.notifications.alerting.grafana.app"
        );
        assert_eq!(info.singular_group_resource().resource, "template");
        assert_eq!(info.type_meta().kind, "Template");
    }
}
