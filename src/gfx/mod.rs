pub mod anim;
pub mod driver;
pub mod frame;
pub mod gl;
pub mod math;

#[cfg(test)]
pub(crate) mod testing;
