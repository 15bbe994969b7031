use tracing::debug;

use crate::api::ModelDescriptor;
use crate::core::capability::{eligible_models, ControlCapabilities};
use crate::core::config::Config;

pub const TEMPERATURE_RANGE: (f64, f64) = (0.01, 2.0);
pub const REASON_RANGE: (f64, f64) = (0.01, 1.0);
pub const VERBOSITY_RANGE: (f64, f64) = (0.01, 1.0);
pub const MEMORY_MAX: u8 = 10;
pub const NO_MODEL_LABEL: &str = "Select Model";

/// Per-session generation controls.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParameters {
    pub model: String,
    pub temperature: f64,
    pub reason: f64,
    pub verbosity: f64,
    /// Number of prior turns replayed to the model. Zero disables memory.
    pub memory: u8,
    pub system_message: String,
}

impl Default for SessionParameters {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 1.0,
            reason: 0.5,
            verbosity: 0.5,
            memory: 5,
            system_message: String::new(),
        }
    }
}

impl SessionParameters {
    pub fn from_config(config: &Config) -> Self {
        let mut params = Self::default();
        if let Some(model) = &config.default_model {
            params.model = model.clone();
        }
        let defaults = &config.parameters;
        if let Some(value) = defaults.temperature {
            params.set_temperature(value);
        }
        if let Some(value) = defaults.reason {
            params.set_reason(value);
        }
        if let Some(value) = defaults.verbosity {
            params.set_verbosity(value);
        }
        if let Some(value) = defaults.memory {
            params.set_memory(value);
        }
        params
    }

    pub fn set_temperature(&mut self, value: f64) {
        if let Some(value) = clamp_finite(value, TEMPERATURE_RANGE) {
            self.temperature = value;
        }
    }

    pub fn set_reason(&mut self, value: f64) {
        if let Some(value) = clamp_finite(value, REASON_RANGE) {
            self.reason = value;
        }
    }

    pub fn set_verbosity(&mut self, value: f64) {
        if let Some(value) = clamp_finite(value, VERBOSITY_RANGE) {
            self.verbosity = value;
        }
    }

    pub fn set_memory(&mut self, value: i64) {
        self.memory = value.clamp(0, i64::from(MEMORY_MAX)) as u8;
    }

    pub fn set_system_message(&mut self, text: impl Into<String>) {
        self.system_message = text.into();
    }
}

fn clamp_finite(value: f64, (min, max): (f64, f64)) -> Option<f64> {
    if value.is_finite() {
        Some(value.clamp(min, max))
    } else {
        debug!(value, "ignoring non-finite parameter value");
        None
    }
}

/// Slider readout: `value / max` as a rounded percentage.
pub fn percent_label(value: f64, max: f64) -> String {
    format!("{}%", ((value / max) * 100.0).round() as i64)
}

pub fn memory_label(memory: u8) -> String {
    if memory == 0 {
        "None".to_string()
    } else {
        memory.to_string()
    }
}

/// Settings owned by one session view. Views borrow it to read and mutate;
/// nothing here is global.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    catalog: Vec<ModelDescriptor>,
    pub params: SessionParameters,
    has_image: bool,
    controls: ControlCapabilities,
    pub alias: String,
}

impl SessionState {
    pub fn new(catalog: Vec<ModelDescriptor>, params: SessionParameters) -> Self {
        Self {
            catalog,
            params,
            ..Default::default()
        }
    }

    pub fn catalog(&self) -> &[ModelDescriptor] {
        &self.catalog
    }

    pub fn has_image(&self) -> bool {
        self.has_image
    }

    /// Mark whether the conversation carries image input.
    pub fn set_has_image(&mut self, has_image: bool) {
        self.has_image = has_image;
    }

    pub fn controls(&self) -> ControlCapabilities {
        self.controls
    }

    pub fn set_controls(&mut self, controls: ControlCapabilities) {
        self.controls = controls;
    }

    pub fn eligible_models(&self) -> Vec<&ModelDescriptor> {
        eligible_models(&self.catalog, self.has_image)
    }

    pub fn current_model(&self) -> Option<&ModelDescriptor> {
        self.catalog
            .iter()
            .find(|model| model.model_name == self.params.model)
    }

    pub fn current_model_alias(&self) -> &str {
        self.current_model()
            .map(|model| model.model_alias.as_str())
            .filter(|alias| !alias.is_empty())
            .unwrap_or(NO_MODEL_LABEL)
    }

    /// Select a model by name. Unknown names are rejected so the selection
    /// always references a catalog entry.
    pub fn update_model(&mut self, model_name: &str) -> Result<(), String> {
        if self.catalog.iter().any(|model| model.model_name == model_name) {
            debug!(model = model_name, "model selected");
            self.params.model = model_name.to_string();
            Ok(())
        } else {
            let available: Vec<&str> = self
                .catalog
                .iter()
                .map(|model| model.model_name.as_str())
                .collect();
            Err(format!(
                "Model '{}' not found. Available models: {}",
                model_name,
                available.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ModelCapabilities, ModelVariants};

    fn catalog() -> Vec<ModelDescriptor> {
        vec![
            ModelDescriptor {
                model_name: "base".into(),
                model_alias: "Base".into(),
                description: String::new(),
                capabilities: ModelCapabilities::default(),
                variants: ModelVariants { base: true },
                billing: Default::default(),
            },
            ModelDescriptor {
                model_name: "vision".into(),
                model_alias: "Vision".into(),
                description: "sees".into(),
                capabilities: ModelCapabilities {
                    image: true,
                    mcp: false,
                },
                variants: ModelVariants::default(),
                billing: Default::default(),
            },
        ]
    }

    #[test]
    fn setters_clamp_into_declared_ranges() {
        let mut params = SessionParameters::default();
        params.set_temperature(5.0);
        assert_eq!(params.temperature, 2.0);
        params.set_temperature(0.0);
        assert_eq!(params.temperature, 0.01);
        params.set_reason(-1.0);
        assert_eq!(params.reason, 0.01);
        params.set_verbosity(1.5);
        assert_eq!(params.verbosity, 1.0);
        params.set_memory(42);
        assert_eq!(params.memory, 10);
        params.set_memory(-3);
        assert_eq!(params.memory, 0);
    }

    #[test]
    fn non_finite_values_leave_parameters_untouched() {
        let mut params = SessionParameters::default();
        params.set_temperature(f64::NAN);
        params.set_reason(f64::INFINITY);
        assert_eq!(params.temperature, 1.0);
        assert_eq!(params.reason, 0.5);
    }

    #[test]
    fn labels_match_slider_readouts() {
        assert_eq!(percent_label(1.0, 2.0), "50%");
        assert_eq!(percent_label(0.333, 1.0), "33%");
        assert_eq!(memory_label(0), "None");
        assert_eq!(memory_label(7), "7");
    }

    #[test]
    fn alias_falls_back_when_nothing_selected() {
        let mut state = SessionState::new(catalog(), SessionParameters::default());
        assert_eq!(state.current_model_alias(), NO_MODEL_LABEL);
        state.update_model("vision").unwrap();
        assert_eq!(state.current_model_alias(), "Vision");
        assert!(state.update_model("missing").is_err());
        assert_eq!(state.params.model, "vision");
    }

    #[test]
    fn eligible_models_track_image_flag() {
        let mut state = SessionState::new(catalog(), SessionParameters::default());
        assert_eq!(state.eligible_models().len(), 1);
        state.set_has_image(true);
        assert_eq!(state.eligible_models()[0].model_name, "vision");
    }

    #[test]
    fn config_defaults_are_clamped() {
        let mut config = Config::default();
        config.default_model = Some("vision".into());
        config.parameters.temperature = Some(9.0);
        config.parameters.memory = Some(3);
        let params = SessionParameters::from_config(&config);
        assert_eq!(params.model, "vision");
        assert_eq!(params.temperature, 2.0);
        assert_eq!(params.memory, 3);
    }
}
