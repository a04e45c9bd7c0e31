/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_tokens: 350,
        }
    }
}

impl ModelConfig {
    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }
}
