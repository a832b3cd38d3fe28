mod config;
mod descriptor;
mod lookup;
mod trailer;

pub use config::{
    parse_configuration, parse_target, ConfigError, Configuration, Target, CONFIGURATION_VERSION,
};
pub use descriptor::{DescriptorError, TargetDescriptor, DESCRIPTOR_VERSION};
pub use lookup::{lookup, LookupError};
pub use trailer::{
    append_descriptor, read_descriptor, read_descriptor_file, DESCRIPTOR_MAX_SIZE, TRAILER_LEN,
    TRAILER_MAGIC,
};
