pub mod filtering;
pub mod settings;
pub mod sorting;
pub mod todo;
pub mod validate;

pub use filtering::{filter_todos, FilterMode};
pub use settings::{Settings, SCHEMA_VERSION};
pub use sorting::{sort_todos, SortField, SortOrder, SortSpec};
pub use todo::{generate_id, NewTodo, Priority, Todo, TodoPatch};
pub use validate::validate_todos;
