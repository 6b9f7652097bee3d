pub mod angle;
pub mod closest_subject;
pub mod entity;
pub mod lifecycle;
pub mod presence;
pub mod slot_classifier;
pub mod stable_value;
pub mod variant_pool;
