pub mod controller;
pub mod form;
pub mod presets;
pub mod recorder;
pub mod timer;

pub use controller::ParameterController;
pub use form::{Field, FieldEvent, FieldEventKind, FieldKind, ParameterForm, Subscription};
pub use presets::{find_preset, PresetDefinition, PRESETS};
pub use recorder::DebouncedRecorder;
pub use timer::{Clock, DebounceTimer, ManualClock, SystemClock};
