//! Macros for reducing boilerplate when defining entities

/// Define a record type and implement [`Entity`](crate::core::Entity) for it
///
/// The generated struct carries an `id: EntityId` followed by the listed
/// fields, and (de)serializes with camelCase keys as the REST backend
/// sends them.
///
/// # Example
/// ```rust,ignore
/// impl_entity!(Todo, "todo", "todos", {
///     user_id: u64,
///     title: String,
///     completed: bool,
/// });
///
/// let todo: Todo = serde_json::from_value(json!({
///     "id": 1, "userId": 1, "title": "delectus aut autem", "completed": false
/// }))?;
/// assert_eq!(Todo::item_path(&todo.id()), "/todos/1");
/// ```
#[macro_export]
macro_rules! impl_entity {
    (
        $(#[$struct_meta:meta])*
        $type:ident, $singular:expr, $plural:expr, {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $field_type:ty
            ),* $(,)?
        }
    ) => {
        $(#[$struct_meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $type {
            /// Identifier assigned by the backend
            pub id: $crate::core::EntityId,

            $(
                $(#[$field_meta])*
                pub $field: $field_type,
            )*
        }

        impl $crate::core::Entity for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn id(&self) -> $crate::core::EntityId {
                self.id.clone()
            }
        }
    };
}
