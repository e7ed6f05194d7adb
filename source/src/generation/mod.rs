mod constant;
mod noise;
mod param_gen;
mod ramp;

pub use constant::ConstParamGen;
pub use noise::NoiseParamGen;
pub use param_gen::ParamGen;
pub use ramp::RampParamGen;
