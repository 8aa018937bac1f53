//! The six record types shown by the CRUD screens

#[macro_use]
pub mod macros;

use chrono::{DateTime, Utc};
use serde_json::Value;

impl_entity!(
    /// A person with an account on the backend
    User, "user", "users", {
        name: String,
        username: String,
        email: String,
        #[serde(default)]
        phone: Option<String>,
        #[serde(default)]
        website: Option<String>,
        /// Nested address object, passed through untouched
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        company: Option<Value>,
    }
);

impl_entity!(
    /// A blog post written by a user
    Post, "post", "posts", {
        user_id: u64,
        title: String,
        body: String,
    }
);

impl_entity!(Todo, "todo", "todos", {
    user_id: u64,
    title: String,
    completed: bool,
});

impl_entity!(Comment, "comment", "comments", {
    post_id: u64,
    name: String,
    email: String,
    body: String,
});

impl_entity!(Photo, "photo", "photos", {
    album_id: u64,
    title: String,
    url: String,
    thumbnail_url: String,
});

impl_entity!(
    /// An entry on the calendar screen
    CalendarEvent, "calendar_event", "calendar", {
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default)]
        all_day: bool,
        #[serde(default)]
        description: Option<String>,
    }
);

impl CalendarEvent {
    /// Whether the event overlaps `[from, to)`
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start < to && self.end > from
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Entity, EntityId};
    use serde_json::json;

    #[test]
    fn test_todo_from_backend_json() {
        let todo: Todo = serde_json::from_value(json!({
            "userId": 1,
            "id": 1,
            "title": "delectus aut autem",
            "completed": false
        }))
        .unwrap();

        assert_eq!(todo.id(), EntityId::Number(1));
        assert_eq!(todo.user_id, 1);
        assert_eq!(Todo::collection_path(), "/todos");
    }

    #[test]
    fn test_photo_uses_camel_case_keys() {
        let photo = Photo {
            id: EntityId::Number(3),
            album_id: 1,
            title: "t".to_string(),
            url: "https://via.placeholder.com/600/24f355".to_string(),
            thumbnail_url: "https://via.placeholder.com/150/24f355".to_string(),
        };
        let value = serde_json::to_value(&photo).unwrap();
        assert_eq!(value["albumId"], 1);
        assert!(value.get("thumbnailUrl").is_some());
    }

    #[test]
    fn test_user_optional_fields_default() {
        let user: User = serde_json::from_value(json!({
            "id": 2,
            "name": "Ervin Howell",
            "username": "Antonette",
            "email": "Shanna@melissa.tv"
        }))
        .unwrap();
        assert!(user.phone.is_none());
        assert_eq!(User::item_path(&user.id()), "/users/2");
    }

    #[test]
    fn test_calendar_event_overlap() {
        let event: CalendarEvent = serde_json::from_value(json!({
            "id": "evt-1",
            "title": "Standup",
            "start": "2024-05-01T09:00:00Z",
            "end": "2024-05-01T09:15:00Z"
        }))
        .unwrap();

        let day_start = "2024-05-01T00:00:00Z".parse().unwrap();
        let day_end = "2024-05-02T00:00:00Z".parse().unwrap();
        assert!(event.overlaps(day_start, day_end));
        assert_eq!(CalendarEvent::resource_name(), "calendar");
        assert_eq!(event.id(), EntityId::Text("evt-1".to_string()));
    }
}
