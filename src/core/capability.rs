//! Which models may be picked, and which parameter controls are exposed.

use crate::api::ModelDescriptor;

/// Control visibility facts attached to the active model by the catalog owner.
/// They are read here, never derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlCapabilities {
    pub temperature: bool,
    pub reason: bool,
    pub verbosity: bool,
    pub system_message: bool,
}

impl ControlCapabilities {
    /// The parameter panel toggle is shown when any slider would be.
    pub fn shows_parameter_panel(&self) -> bool {
        self.temperature || self.reason || self.verbosity
    }

    pub fn shows_instruction_editor(&self) -> bool {
        self.system_message
    }
}

/// Models offered in the picker, in catalog order.
///
/// Base variants are never selectable. When the session carries image input,
/// models without image understanding are dropped as well.
pub fn eligible_models(catalog: &[ModelDescriptor], has_image: bool) -> Vec<&ModelDescriptor> {
    catalog
        .iter()
        .filter(|model| !model.variants.base)
        .filter(|model| !has_image || model.capabilities.image)
        .collect()
}

/// Picker row text: alias, badges, and the billing line.
pub fn picker_label(model: &ModelDescriptor) -> String {
    let mut label = if model.model_alias.is_empty() {
        model.model_name.clone()
    } else {
        model.model_alias.clone()
    };
    if model.capabilities.image {
        label.push_str(" [image]");
    }
    if model.capabilities.mcp {
        label.push_str(" [MCP]");
    }
    label
}

pub fn billing_label(model: &ModelDescriptor) -> String {
    format!(
        "In {}$ / Out {}$",
        model.billing.in_billing, model.billing.out_billing
    )
}
