pub mod error;
pub mod icon_gen;
pub mod manifest_json;
pub mod render;
pub mod stub;

pub use error::RenderError;
pub use icon_gen::{
    generate_icons, BatchReport, Capability, GeneratorConfig, IconGenerator, IconReport, IconSpec,
};
