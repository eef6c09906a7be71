use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};

const MAX_WINDOW_MONTHS: u32 = 1200;

/// cycles listed around the current one when enumerating payment events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    /// cycles before the current cycle
    pub past_months: u32,
    /// cycles after the current cycle
    pub future_months: u32,
}

impl EventWindow {
    pub fn new(past_months: u32, future_months: u32) -> Self {
        Self {
            past_months,
            future_months,
        }
    }

    /// number of cycles in the window, the current one included
    pub fn cycle_count(&self) -> u32 {
        self.past_months + self.future_months + 1
    }

    pub fn validate(&self) -> Result<()> {
        // a window wider than a century is a units mistake
        if self.past_months > MAX_WINDOW_MONTHS || self.future_months > MAX_WINDOW_MONTHS {
            return Err(EngineError::InvalidConfiguration {
                message: format!(
                    "event window {}/{} months is too wide",
                    self.past_months, self.future_months
                ),
            });
        }
        Ok(())
    }
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::new(1, 3)
    }
}

/// engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub window: EventWindow,
    /// bill only credit cards in cycles; charges on other cards settle immediately
    #[serde(default = "default_credit_cards_only")]
    pub credit_cards_only: bool,
}

fn default_credit_cards_only() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: EventWindow::default(),
            credit_cards_only: default_credit_cards_only(),
        }
    }
}

impl EngineConfig {
    /// statement view: one closed cycle and three upcoming ones
    pub fn statement() -> Self {
        Self::default()
    }

    /// reconciliation view: one closed cycle and two upcoming ones
    pub fn reconcile() -> Self {
        Self {
            window: EventWindow::new(1, 2),
            ..Self::default()
        }
    }

    pub fn with_window(mut self, past_months: u32, future_months: u32) -> Self {
        self.window = EventWindow::new(past_months, future_months);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.window.validate()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| EngineError::InvalidConfiguration {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::InvalidConfiguration {
            message: e.to_string(),
        })
    }
}
