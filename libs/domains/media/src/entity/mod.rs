pub mod media_objects;
