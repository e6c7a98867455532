mod event;
mod profile;

pub use self::{event::*, profile::*};
