mod container;
pub mod image;
pub mod install_properties;
pub mod ranger;
pub mod traits;
pub mod wait;

pub use container::{Container, ContainerSpec, ContainerState, CopyFile, CopySource};
pub use image::ImageName;
pub use install_properties::InstallProperties;
pub use ranger::{
    Credentials, Dependency, DependencyRole, InstallPropertiesSource, RangerContainer, StackPlan,
};
pub use traits::ContainerRuntime;
pub use wait::WaitCondition;
