// Purpose - external adapters: audio containers and the fragment loader.
// Nothing here contains synthesis logic; both modules are thin, replaceable
// consumers/producers of the core's types.

pub mod fragment;
pub mod wav;
