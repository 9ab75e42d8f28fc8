pub mod camera_device;
