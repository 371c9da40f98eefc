pub mod coordinator;
pub mod gate;
pub mod plan;
pub mod state;


pub use coordinator::{MissionContext, MissionCoordinator, MissionSettings};
pub use gate::PlanGate;
pub use plan::{plot_id, MissionPlan};
pub use state::{MissionState, MissionStateHandle, MissionStatus};
