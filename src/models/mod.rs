// Models module

pub mod tutorial;

// Re-export commonly used types
pub use tutorial::{
    CreateTutorialRequest, FieldError, MessageResponse, NewTutorial, Tutorial, TutorialChanges,
    UpdateTutorialRequest,
};
