use chrono::{DateTime, NaiveDate};
use common::{Author, Book, registry};
use jsonapi_model::{
    AttributeError, AttributeValue, EntityError, Error, Model, Relation,
};
use library_service::MockApi;
use serde_json::json;

mod common;

#[test]
fn test_read_only_attributes_are_not_serialized() {
    let registry = registry(&MockApi::new());
    let book = Book::new(&registry).unwrap();

    book.set_attribute("title", "Dune").unwrap();
    book.set_attribute("created-at", "2020-01-01T10:00:00").unwrap();

    let resource = book.to_resource();
    assert_eq!(resource.attributes.get("title"), Some(&json!("Dune")));
    assert!(!resource.attributes.contains_key("created-at"));

    // Still readable locally.
    assert_eq!(
        book.raw_attribute("created-at"),
        Some(json!("2020-01-01T10:00:00"))
    );
}

#[test]
fn test_id_is_serialized_only_once_persisted() {
    let registry = registry(&MockApi::new());
    let book = Book::new(&registry).unwrap();
    book.set_attribute("title", "Dune").unwrap();

    assert!(!book.is_persisted());
    assert_eq!(book.to_resource().id, None);

    book.set_id(Some(String::new()));
    assert!(!book.is_persisted());
    assert_eq!(book.to_resource().id, None);

    book.set_id(Some("7".to_string()));
    assert!(book.is_persisted());
    assert_eq!(book.to_resource().id.as_deref(), Some("7"));
}

#[test]
fn test_document_shape() {
    let registry = registry(&MockApi::new());
    let book = Book::new(&registry).unwrap();
    let author = Author::new(&registry).unwrap();
    author.set_id(Some("9".to_string()));

    book.set_id(Some("1".to_string()));
    book.set_attribute("title", "Dune").unwrap();
    book.author().unwrap().associate(&author).unwrap();

    let document = serde_json::to_value(book.to_document()).unwrap();
    assert_eq!(
        document,
        json!({
            "data": {
                "type": "books",
                "id": "1",
                "attributes": { "title": "Dune" },
                "relationships": {
                    "author": { "data": { "type": "authors", "id": "9" } }
                }
            }
        })
    );
}

#[test]
fn test_attributes_keep_assignment_order() {
    let registry = registry(&MockApi::new());
    let author = Author::new(&registry).unwrap();

    author.set_attribute("name", "Octavia Butler").unwrap();
    author.set_attribute("born", 1947).unwrap();
    author.set_attribute("country", "US").unwrap();
    author.set_attribute("name", "Octavia E. Butler").unwrap();

    let attributes = author.attributes();
    assert_eq!(
        attributes.keys().collect::<Vec<_>>(),
        vec!["name", "born", "country"]
    );
    assert_eq!(attributes.get("name"), Some(&json!("Octavia E. Butler")));
}

#[test]
fn test_unpopulated_relations_are_omitted() {
    let registry = registry(&MockApi::new());
    let author = Author::new(&registry).unwrap();
    author.set_id(Some("9".to_string()));

    author.set_relation("books", Relation::Many(vec![])).unwrap();
    author.set_relation("agent", Relation::Absent).unwrap();

    assert!(author.to_resource().relationships.is_empty());
}

#[test]
fn test_relations_to_unpersisted_entities_are_omitted() {
    let registry = registry(&MockApi::new());
    let author = Author::new(&registry).unwrap();
    author.set_id(Some("9".to_string()));
    let draft = Book::new(&registry).unwrap();
    draft.set_attribute("title", "Untitled").unwrap();

    author.books().unwrap().attach(&draft).unwrap();
    assert_eq!(author.books().unwrap().loaded().unwrap().len(), 1);

    assert!(author.to_resource().relationships.is_empty());
    assert_eq!(
        serde_json::to_value(author.to_document()).unwrap(),
        json!({ "data": { "type": "authors", "id": "9" } })
    );

    // Persisted targets are still sent, unpersisted ones are skipped.
    let published = Book::new(&registry).unwrap();
    published.set_id(Some("1".to_string()));
    author.books().unwrap().attach(&published).unwrap();
    assert_eq!(
        serde_json::to_value(&author.to_resource().relationships).unwrap(),
        json!({ "books": { "data": [{ "type": "books", "id": "1" }] } })
    );
}

#[test]
fn test_date_attributes_round_trip() {
    let registry = registry(&MockApi::new());
    let book = Book::new(&registry).unwrap();
    let published = NaiveDate::from_ymd_opt(2015, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
        .fixed_offset();

    book.set_date("published-at", published).unwrap();
    assert_eq!(book.raw_attribute("published-at"), Some(json!("2015-06-01")));
    assert_eq!(book.date("published-at").unwrap(), Some(published));
    assert_eq!(
        book.attribute("published-at").unwrap(),
        Some(AttributeValue::Date(published))
    );

    // Any parseable date is normalized to the configured format.
    book.set_attribute("published-at", "2015-06-01T18:30:00").unwrap();
    assert_eq!(book.raw_attribute("published-at"), Some(json!("2015-06-01")));
}

#[test]
fn test_plain_attributes_read_as_iso_dates_with_offset() {
    let registry = registry(&MockApi::new());
    let book = Book::new(&registry).unwrap();
    let signed = DateTime::parse_from_rfc3339("2016-02-29T09:15:00-05:00").unwrap();

    book.set_date("signed-at", signed).unwrap();

    assert_eq!(
        book.raw_attribute("signed-at"),
        Some(json!("2016-02-29T09:15:00-05:00"))
    );
    let read = book.date("signed-at").unwrap().unwrap();
    assert_eq!(read, signed);
    assert_eq!(read.offset(), signed.offset());
}

#[test]
fn test_invalid_date_is_rejected() {
    let registry = registry(&MockApi::new());
    let book = Book::new(&registry).unwrap();
    book.set_attribute("published-at", "2015-06-01").unwrap();

    let err = book
        .set_attribute("published-at", "not a date")
        .unwrap_err();

    match err {
        Error::Attribute(AttributeError::InvalidDate { attribute, value }) => {
            assert_eq!(attribute, "published-at");
            assert_eq!(value, "not a date");
        }
        other => panic!("Expected an invalid date error, got {other:?}"),
    }

    // The previous value is kept.
    assert_eq!(book.raw_attribute("published-at"), Some(json!("2015-06-01")));
}

#[test]
fn test_plain_attributes_are_not_dates() {
    let registry = registry(&MockApi::new());
    let book = Book::new(&registry).unwrap();
    book.set_attribute("title", "2015-06-01").unwrap();

    assert_eq!(
        book.attribute("title").unwrap(),
        Some(AttributeValue::Json(json!("2015-06-01")))
    );
    assert_eq!(book.attribute("missing").unwrap(), None);
}

#[test]
fn test_attribute_and_relation_names_do_not_collide() {
    let registry = registry(&MockApi::new());
    let book = Book::new(&registry).unwrap();
    let author = Author::new(&registry).unwrap();

    book.author().unwrap().associate(&author).unwrap();
    let err = book.set_attribute("author", "someone").unwrap_err();
    assert!(matches!(
        err,
        Error::Entity(EntityError::AttributeIsRelation(ref name)) if name == "author"
    ));

    book.set_attribute("title", "Dune").unwrap();
    let err = book
        .set_relation("title", Relation::One(author.as_ref().clone()))
        .unwrap_err();
    assert_eq!(err, EntityError::RelationIsAttribute("title".to_string()));
}

#[test]
fn test_relation_keys_walk_nested_relations() {
    let registry = registry(&MockApi::new());
    let book = Book::new(&registry).unwrap();
    let author = Author::new(&registry).unwrap();

    book.author().unwrap().associate(&author).unwrap();
    author.books().unwrap().attach(&book).unwrap();

    assert_eq!(book.relation_keys(), vec!["author", "author.books"]);
    assert_eq!(
        book.relation_keys_with_prefix("shelf"),
        vec!["shelf.author", "shelf.author.books"]
    );

    book.author().unwrap().dissociate().unwrap();
    assert!(book.relation_keys().is_empty());
}

#[test]
fn test_attach_and_detach() {
    let registry = registry(&MockApi::new());
    let author = Author::new(&registry).unwrap();
    let first = Book::new(&registry).unwrap();
    let second = Book::new(&registry).unwrap();
    first.set_id(Some("1".to_string()));
    second.set_id(Some("2".to_string()));

    let books = author.books().unwrap();
    assert!(books.loaded().is_none());

    books.attach(&first).unwrap();
    books.attach(&second).unwrap();
    books.attach(&first).unwrap();
    assert_eq!(books.loaded().unwrap().len(), 2);

    // A different instance with the same identity counts as the same resource.
    let copy = Book::new(&registry).unwrap();
    copy.set_id(Some("1".to_string()));
    assert!(books.detach(&copy).unwrap());
    assert!(!books.detach(&copy).unwrap());

    let loaded = books.loaded().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].ptr_eq(&second));
}

#[test]
fn test_clear_relations() {
    let registry = registry(&MockApi::new());
    let book = Book::new(&registry).unwrap();
    let author = Author::new(&registry).unwrap();

    book.author().unwrap().associate(&author).unwrap();
    author.books().unwrap().attach(&book).unwrap();

    book.clear_relations();
    author.clear_relations();

    assert!(book.relations().is_empty());
    assert!(book.author().unwrap().loaded().is_none());
}
