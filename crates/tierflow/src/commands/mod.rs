pub mod exports;
pub mod order;
pub mod publish;
pub mod subnets;
pub mod synth;
pub mod validate;
