// Struct representing the request body for creating a new Todo.
// Any client-supplied `_id` or `completed` is ignored.
#[derive(Debug, serde::Deserialize)]
pub struct CreateTodoSchema {
    #[serde(default)]
    pub body: Option<String>,
}
