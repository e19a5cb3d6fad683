//! Configuration module for Spendcast Core.

pub mod settings;

pub use settings::{
    BillingSettings, ForecastSettings, NarrationSettings, PipelineSettings, Settings, SettingsError,
    SettingsResult,
};
