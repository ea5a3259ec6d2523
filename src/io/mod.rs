// Purpose - wire formats shared with external collaborators

pub mod converter;
pub mod midi;
