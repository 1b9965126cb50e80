mod scripted;

pub use scripted::ScriptedCamera;
