//! Conversion between legacy templates and `Template` resources.
//!
//! # Invariants
//! - `to_domain(&to_resource(org, &t, mapper))` keeps `name` and `template`.
//! - Provenance flows one way: legacy -> `provenance` annotation. The reverse
//!   conversion always yields `Provenance::None`.
//! - The namespace is always derived from the org id, never copied.

use crate::apis::info::templates_resource_info;
use crate::apis::namespace::NamespaceMapper;
use crate::model::resource::{
    ObjectMeta, TemplateList, TemplateResource, TemplateSpec, PROVENANCE_ANNOTATION,
};
use crate::model::template::{NotificationTemplate, Provenance};
use std::collections::BTreeMap;

pub fn to_resource(
    org_id: i64,
    template: &NotificationTemplate,
    namespacer: &dyn NamespaceMapper,
) -> TemplateResource {
    TemplateResource {
        type_meta: templates_resource_info().type_meta(),
        metadata: ObjectMeta {
            name: template.name.clone(),
            namespace: namespacer.namespace(org_id),
            annotations: BTreeMap::from([(
                PROVENANCE_ANNOTATION.to_string(),
                template.provenance.as_str().to_string(),
            )]),
            ..ObjectMeta::default()
        },
        spec: TemplateSpec {
            template: template.template.clone(),
        },
    }
}

pub fn to_resource_list(
    org_id: i64,
    templates: &[NotificationTemplate],
    namespacer: &dyn NamespaceMapper,
) -> TemplateList {
    TemplateList::new(
        templates
            .iter()
            .map(|template| to_resource(org_id, template, namespacer))
            .collect(),
    )
}

pub fn to_domain(resource: &TemplateResource) -> NotificationTemplate {
    NotificationTemplate {
        name: resource.metadata.name.clone(),
        template: resource.spec.template.clone(),
        provenance: Provenance::None,
    }
}
