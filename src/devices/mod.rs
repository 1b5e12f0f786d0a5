//! Circuit component models for the power-management simulation.

/// Capacitor energy-storage model.
pub mod capacitor;
/// Buck-converter output stage.
pub mod converter;
/// Boost-charger stage and state machine.
pub mod harvester;
/// Algebraic two-of-three load.
pub mod load;
/// Time-indexed power source.
pub mod source;
pub mod types;

// Re-export the main types for convenience
pub use capacitor::Capacitor;
pub use converter::{Converter, ConverterTask};
pub use harvester::{Harvester, HarvesterState, HarvesterTask, StateWatch};
pub use load::LoadSink;
pub use source::{PowerSource, SourceFeed};
pub use types::Enable;
pub use types::OutputLoad;
