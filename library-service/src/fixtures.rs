//! JSON:API documents of a small library: `books` written by `authors`.
use serde_json::{Value, json};

pub fn book(id: &str, title: &str, author_id: Option<&str>) -> Value {
    let author = match author_id {
        Some(author_id) => json!({ "type": "authors", "id": author_id }),
        None => Value::Null,
    };
    json!({
        "type": "books",
        "id": id,
        "attributes": {
            "title": title,
            "published-at": "2015-06-01",
            "created-at": "2020-01-01T10:00:00"
        },
        "relationships": {
            "author": { "data": author }
        }
    })
}

pub fn author(id: &str, name: &str, book_ids: &[&str]) -> Value {
    let books: Vec<Value> = book_ids
        .iter()
        .map(|book_id| json!({ "type": "books", "id": book_id }))
        .collect();
    json!({
        "type": "authors",
        "id": id,
        "attributes": { "name": name },
        "relationships": {
            "books": { "data": books }
        }
    })
}

pub fn single(data: Value) -> Value {
    json!({ "data": data })
}

pub fn collection(data: Vec<Value>) -> Value {
    json!({ "data": data })
}

/// A page of `data` out of `total` resources.
pub fn page(data: Vec<Value>, total: u64) -> Value {
    json!({
        "data": data,
        "meta": { "page": { "total": total } }
    })
}

/// Two books by the same author, who links back to both of them.
pub fn books_with_shared_author() -> Value {
    json!({
        "data": [
            book("1", "The Dispossessed", Some("9")),
            book("2", "The Lathe of Heaven", Some("9"))
        ],
        "included": [
            author("9", "Ursula K. Le Guin", &["1", "2"])
        ]
    })
}

/// One book whose author links back to it.
pub fn book_with_author() -> Value {
    json!({
        "data": book("1", "The Dispossessed", Some("9")),
        "included": [
            author("9", "Ursula K. Le Guin", &["1"])
        ]
    })
}

/// A created resource as echoed back by the server.
pub fn created(resource_type: &str, id: &str) -> Value {
    json!({
        "data": { "type": resource_type, "id": id, "attributes": {} }
    })
}

pub fn not_found() -> Value {
    json!({
        "errors": [
            { "status": "404", "title": "Not Found" }
        ]
    })
}
