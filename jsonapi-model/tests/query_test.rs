use common::{Author, Book, offset_registry, registry, url};
use http::{Method, header};
use jsonapi_model::{
    AttributeValue, ConfigError, Error, Model, ModelConfig, Registry, Relation, SortDirection,
    transport::JSON_API_MEDIA_TYPE,
};
use library_service::{BASE_URL, MockApi, fixtures};
use serde_json::json;
use std::sync::Arc;

mod common;

fn pairs(params: &[(String, String)]) -> Vec<(&str, &str)> {
    params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

#[test]
fn test_query_params() {
    let registry = registry(&MockApi::new());

    let query = Book::query(&registry)
        .unwrap()
        .filter("genre", "sci-fi")
        .with(["author", "author.books"])
        .with("author")
        .order_by("title", SortDirection::Asc)
        .order_by("published-at", SortDirection::Desc)
        .page(3)
        .limit(20)
        .option("fields[books]", "title");

    assert_eq!(
        pairs(&query.params()),
        vec![
            ("filter[genre]", "sci-fi"),
            ("include", "author,author.books"),
            ("sort", "title,-published-at"),
            ("page[number]", "3"),
            ("page[size]", "20"),
            ("fields[books]", "title"),
        ]
    );
}

#[test]
fn test_offset_pagination_params() {
    let registry = offset_registry(&MockApi::new());

    let query = Book::query(&registry).unwrap().page(40).limit(20);

    assert_eq!(
        pairs(&query.params()),
        vec![("page[offset]", "40"), ("page[limit]", "20")]
    );
}

#[test]
fn test_options_override_generated_params() {
    let registry = registry(&MockApi::new());

    let query = Book::limit(&registry, 10)
        .unwrap()
        .option("page[size]", 5);

    assert_eq!(
        query.url().unwrap(),
        url("books?page%5Bnumber%5D=1&page%5Bsize%5D=5")
    );
}

#[test]
fn test_builder_is_not_consumed_by_terminal_calls() {
    let registry = registry(&MockApi::new());
    let query = Book::filter(&registry, "genre", "sci-fi").unwrap();
    let narrowed = query.clone().filter("year", 1974);

    assert_eq!(query.params().len(), 3);
    assert_eq!(narrowed.params().len(), 4);
}

#[tokio::test]
async fn test_get_shares_included_instances() {
    let api = MockApi::new();
    api.on_get(
        &url("books?include=author&page[number]=1&page[size]=50"),
        fixtures::books_with_shared_author(),
    );
    let registry = registry(&api);

    let books = Book::with(&registry, "author").unwrap().get(None).await.unwrap();

    assert_eq!(books.len(), 2);
    let first = books.data()[0].author().unwrap().loaded().unwrap();
    let second = books.data()[1].author().unwrap().loaded().unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(first.raw_attribute("name"), Some(json!("Ursula K. Le Guin")));

    // The author links back to the very same book instances.
    let written = first.books().unwrap().loaded().unwrap();
    assert_eq!(written.len(), 2);
    assert!(written[0].ptr_eq(&books.data()[0]));
    assert!(written[1].ptr_eq(&books.data()[1]));
}

#[tokio::test]
async fn test_find_assembles_circular_graph() {
    let api = MockApi::new();
    api.on_get(&url("books/1?include=author"), fixtures::book_with_author());
    let registry = registry(&api);

    let response = Book::with(&registry, "author")
        .unwrap()
        .find("1")
        .await
        .unwrap();
    let book = response.into_data().unwrap();

    assert_eq!(book.id().as_deref(), Some("1"));
    assert_eq!(book.raw_attribute("title"), Some(json!("The Dispossessed")));

    let author = book.author().unwrap().loaded().unwrap();
    let books = author.books().unwrap().loaded().unwrap();
    assert!(books[0].ptr_eq(&book));
    assert_eq!(book.relation_keys(), vec!["author", "author.books"]);
}

#[tokio::test]
async fn test_circular_graph_is_freed_with_its_last_handle() {
    let api = MockApi::new();
    api.on_get(&url("books/1?include=author"), fixtures::book_with_author());
    let registry = registry(&api);
    assert_eq!(Arc::strong_count(&registry), 1);

    let book = Book::with(&registry, "author")
        .unwrap()
        .find("1")
        .await
        .unwrap()
        .into_data()
        .unwrap();
    let author = book.author().unwrap().loaded().unwrap();
    assert!(Arc::strong_count(&registry) > 1);

    // Any handle keeps the whole graph, cycles included, alive.
    drop(book);
    let books = author.books().unwrap().loaded().unwrap();
    assert_eq!(books[0].raw_attribute("title"), Some(json!("The Dispossessed")));
    assert!(books[0].author().unwrap().loaded().unwrap().ptr_eq(&author));

    drop(books);
    drop(author);
    assert_eq!(Arc::strong_count(&registry), 1);
}

#[tokio::test]
async fn test_missing_related_resources_become_stubs() {
    let api = MockApi::new();
    api.on_get(
        &url("books/3"),
        fixtures::single(fixtures::book("3", "Kindred", Some("4"))),
    );
    let registry = registry(&api);

    let book = Book::find(&registry, "3")
        .await
        .unwrap()
        .into_data()
        .unwrap();
    let author = book.author().unwrap().loaded().unwrap();

    assert_eq!(author.id().as_deref(), Some("4"));
    assert_eq!(author.resource_type(), Author::RESOURCE_TYPE);
    assert!(author.attributes().is_empty());
}

#[tokio::test]
async fn test_null_to_one_linkage_is_not_loaded() {
    let api = MockApi::new();
    api.on_get(
        &url("books/5"),
        fixtures::single(fixtures::book("5", "Anonymous", None)),
    );
    let registry = registry(&api);

    let book = Book::find(&registry, "5")
        .await
        .unwrap()
        .into_data()
        .unwrap();

    assert!(matches!(book.relation("author"), Some(Relation::Absent)));
    assert!(book.author().unwrap().loaded().is_none());
    assert!(book.relation_keys().is_empty());
    assert!(book.to_resource().relationships.is_empty());
}

#[tokio::test]
async fn test_dates_with_offsets_are_populated() {
    let api = MockApi::new();
    api.on_get(
        &url("events/e1"),
        json!({
            "data": {
                "type": "events",
                "id": "e1",
                "attributes": { "name": "Reading", "starts-at": "2024-03-05T10:20:00+02:00" }
            }
        }),
    );
    let registry = Registry::builder()
        .base_url(BASE_URL)
        .transport(api.clone())
        .register(ModelConfig::new("events").date("starts-at", "%Y-%m-%dT%H:%M:%S%:z"))
        .build()
        .unwrap();

    let event = registry
        .query_type("events")
        .unwrap()
        .find("e1")
        .await
        .unwrap()
        .into_data()
        .unwrap();

    assert_eq!(
        event.raw_attribute("starts-at"),
        Some(json!("2024-03-05T10:20:00+02:00"))
    );
    match event.attribute("starts-at").unwrap() {
        Some(AttributeValue::Date(starts)) => {
            assert_eq!(starts.offset().local_minus_utc(), 2 * 3600);
            assert_eq!(starts.to_rfc3339(), "2024-03-05T10:20:00+02:00");
        }
        other => panic!("Expected a date, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unregistered_types_use_registry_defaults() {
    let api = MockApi::new();
    api.on_get(
        &url("books/1?include=publisher"),
        json!({
            "data": {
                "type": "books",
                "id": "1",
                "attributes": { "title": "Dune" },
                "relationships": {
                    "publisher": { "data": { "type": "publishers", "id": "p1" } }
                }
            },
            "included": [
                { "type": "publishers", "id": "p1", "attributes": { "name": "Chilton" } }
            ]
        }),
    );
    let registry = registry(&api);

    let book = Book::with(&registry, "publisher")
        .unwrap()
        .find("1")
        .await
        .unwrap()
        .into_data()
        .unwrap();

    let publisher = book.relation("publisher").unwrap().entities()[0].clone();
    assert_eq!(publisher.resource_type(), "publishers");
    assert_eq!(publisher.raw_attribute("name"), Some(json!("Chilton")));
    assert_eq!(
        publisher.entity_type().resource_url("p1").unwrap(),
        url("publishers/p1")
    );
}

#[tokio::test]
async fn test_first_requests_a_single_resource() {
    let api = MockApi::new();
    api.on_get(
        &url("books?sort=-published-at&page[number]=1&page[size]=1"),
        fixtures::collection(vec![fixtures::book("2", "The Lathe of Heaven", None)]),
    );
    let registry = registry(&api);

    let response = Book::order_by(&registry, "published-at", SortDirection::Desc)
        .unwrap()
        .first()
        .await
        .unwrap();

    assert_eq!(response.data().unwrap().id().as_deref(), Some("2"));
}

#[tokio::test]
async fn test_empty_data_resolves_to_none() {
    let api = MockApi::new();
    api.on_get(&url("books/8"), json!({ "data": null }));
    let registry = registry(&api);

    let response = Book::find(&registry, "8").await.unwrap();

    assert!(response.data().is_none());
}

#[tokio::test]
async fn test_find_missing_resource_surfaces_transport_error() {
    let api = MockApi::new();
    let registry = registry(&api);

    let err = Book::find(&registry, "404").await.unwrap_err();

    match err {
        Error::Transport(e) => {
            assert!(e.is_not_found());
            assert_eq!(e.status(), Some(http::StatusCode::NOT_FOUND));
        }
        other => panic!("Expected a transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_requests_carry_json_api_headers() {
    let api = MockApi::new();
    api.on_get(&url("books/1"), fixtures::single(fixtures::book("1", "Dune", None)));
    let registry = registry(&api);

    Book::find(&registry, "1").await.unwrap();

    let request = api.last_request().unwrap();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.url, url("books/1"));
    assert_eq!(request.headers[header::ACCEPT], JSON_API_MEDIA_TYPE);
    assert_eq!(request.headers[header::CONTENT_TYPE], JSON_API_MEDIA_TYPE);
    assert!(request.body.is_none());
}

#[tokio::test]
async fn test_non_document_body_is_rejected() {
    let api = MockApi::new();
    api.on_get(&url("books/1"), json!("definitely not a document"));
    let registry = registry(&api);

    let err = Book::find(&registry, "1").await.unwrap_err();

    assert!(matches!(err, Error::Document { ref url, .. } if url.ends_with("books/1")));
}

#[tokio::test]
async fn test_missing_configuration_fails_before_any_request() {
    let api = MockApi::new();
    let registry = Registry::builder()
        .transport(api.clone())
        .register(ModelConfig::new("books"))
        .build()
        .unwrap();

    let err = Book::get(&registry, None).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::MissingBaseUrl(ref ty)) if ty == "books"
    ));

    let err = Author::query(&registry).unwrap_err();
    assert_eq!(err, ConfigError::UnknownType("authors".to_string()));

    assert_eq!(api.request_count(), 0);
}

#[tokio::test]
async fn test_endpoint_override() {
    let api = MockApi::new();
    api.on_get(
        &url("catalog/books?page[number]=1&page[size]=50"),
        fixtures::collection(vec![]),
    );
    let registry = Registry::builder()
        .base_url(format!("{}/", library_service::BASE_URL))
        .transport(api.clone())
        .register(ModelConfig::new("books").endpoint("/catalog/books/"))
        .build()
        .unwrap();

    let books = Book::get(&registry, None).await.unwrap();

    assert!(books.is_empty());
    assert_eq!(
        api.last_request().unwrap().url,
        url("catalog/books?page%5Bnumber%5D=1&page%5Bsize%5D=50")
    );
}

#[tokio::test]
async fn test_list_round_trip_write_payload() {
    let api = MockApi::new();
    api.on_get(
        &url("books?include=author&page[number]=1&page[size]=50"),
        fixtures::books_with_shared_author(),
    );
    let registry = registry(&api);

    let books = Book::with(&registry, "author").unwrap().get(None).await.unwrap();

    for book in &books {
        let resource = book.to_resource();
        assert!(!resource.attributes.contains_key("created-at"));
        assert!(resource.attributes.contains_key("title"));
        assert_eq!(resource.relationships.keys().collect::<Vec<_>>(), vec!["author"]);
        assert_eq!(resource.id, book.id());
    }

    let author = books.data()[0].author().unwrap().loaded().unwrap();
    let resource = author.to_resource();
    assert_eq!(resource.relationships.keys().collect::<Vec<_>>(), vec!["books"]);
    assert_eq!(
        serde_json::to_value(&resource.relationships).unwrap(),
        json!({
            "books": { "data": [
                { "type": "books", "id": "1" },
                { "type": "books", "id": "2" }
            ] }
        })
    );
}
