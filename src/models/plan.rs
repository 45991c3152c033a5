use serde::{Deserialize, Serialize};

/// Structured scene plan produced by the planning stage.
///
/// Immutable once created; embedded on the owning job and echoed in the
/// planner's `completed` log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenePlan {
    pub title: String,
    pub description: String,
    /// Total duration in seconds.
    pub duration: f64,
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub name: String,
    pub description: String,
    pub start_time: f64,
    pub end_time: f64,
    pub elements: Vec<SceneElement>,
    pub animations: Vec<SceneAnimation>,
}

/// A visual element within a scene (text, shape, equation, graph, arrow).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// An animation applied to an element (FadeIn, Write, Create, Transform, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneAnimation {
    #[serde(rename = "type")]
    pub kind: String,
    /// Reference to the element being animated.
    pub target: String,
    /// Duration in seconds.
    pub duration: f64,
    pub description: String,
}
