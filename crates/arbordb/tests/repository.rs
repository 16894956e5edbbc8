//! End-to-end scenarios through the public API: context, fluent mappings,
//! providers, and serializers working together.

use arbordb::{
    prelude::*,
    provider::{DelegateProvider, FileProvider, MemoryProvider, Provider},
    scalar_enum,
    serialize::JsonSerializer,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

scalar_enum! {
    pub enum Status {
        #[default]
        Draft,
        Published,
    }
}

///
/// Person
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
pub struct Person {
    pub id: Ulid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub birthday: Timestamp,
    #[entity(child)]
    pub geek: Option<Geek>,
    #[entity(child)]
    pub geeks: Vec<Geek>,
}

///
/// Geek
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
pub struct Geek {
    pub alias: String,
}

///
/// Article
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
pub struct Article {
    pub id: Ulid,
    pub title: String,
    pub status: Status,
}

fn person(random: u128, first_name: &str) -> Person {
    Person {
        id: Ulid::from_parts(1_000, random),
        first_name: first_name.to_string(),
        ..Person::default()
    }
}

#[test]
fn save_load_delete_scenario() {
    let ctx = Context::builder().build();
    let people = ctx.repository::<Person, Ulid>().unwrap();

    people.save_on_submit(&person(1, "Peter")).unwrap();
    people.save_on_submit(&person(2, "Golo")).unwrap();
    assert_eq!(people.load_all().unwrap().len(), 2);

    let peter = people.load_by(|p| p.first_name == "Peter").unwrap();
    assert_eq!(peter.first_name, "Peter");

    people
        .delete_on_submit_by(|p| p.first_name == "Peter")
        .unwrap();

    let rest = people.load_all().unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].first_name, "Golo");
}

#[test]
fn nested_object_and_collection_survive_a_full_persist_cycle() {
    let provider = Arc::new(MemoryProvider::new());

    let saved = Person {
        id: Ulid::from_parts(1_000, 3),
        first_name: "Peter".to_string(),
        last_name: Some("Bucher".to_string()),
        birthday: Timestamp::from_seconds(435_196_800),
        geek: Some(Geek {
            alias: "Jackal".to_string(),
        }),
        geeks: vec![
            Geek {
                alias: "first".to_string(),
            },
            Geek {
                alias: "second".to_string(),
            },
        ],
    };

    {
        let ctx = Context::builder()
            .provider_handle(Arc::clone(&provider) as Arc<dyn Provider>)
            .build();
        let people = ctx.repository::<Person, Ulid>().unwrap();
        people.save_on_submit(&saved).unwrap();
        people.submit_changes().unwrap();
    }

    // a fresh context over the same data source sees the whole graph
    let ctx = Context::builder()
        .provider_handle(Arc::clone(&provider) as Arc<dyn Provider>)
        .build();
    let people = ctx.repository::<Person, Ulid>().unwrap();
    let loaded = people.load(&saved.id).unwrap();

    assert_eq!(loaded, saved);
    assert_eq!(loaded.geeks[0].alias, "first");
    assert_eq!(loaded.geeks[1].alias, "second");
}

#[test]
fn repositories_are_cached_per_configuration() {
    let ctx = Context::builder().build();

    let first = ctx.repository::<Person, Ulid>().unwrap();
    let second = ctx.repository::<Person, Ulid>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let by_name = ctx
        .repository_with::<Person, String>(
            RepositoryConfig::new().with_query_property("first_name"),
        )
        .unwrap();
    assert_eq!(by_name.query_property(), "first_name");
    assert_eq!(ctx.cache().len(), 2);
}

#[test]
fn explicit_mappings_shape_the_document() {
    let provider = Arc::new(MemoryProvider::new());
    let ctx = Context::builder()
        .provider_handle(Arc::clone(&provider) as Arc<dyn Provider>)
        .build();

    MappingBuilder::<Person>::new()
        .map("id")
        .unwrap()
        .to_attribute_as("key")
        .map("last_name")
        .unwrap()
        .to_element_as("surname")
        .register(ctx.registry())
        .unwrap();

    let people = ctx.repository::<Person, Ulid>().unwrap();
    let mut peter = person(4, "Peter");
    peter.last_name = Some("Bucher".to_string());

    people.save_on_submit(&peter).unwrap();
    people.submit_changes().unwrap();

    let stored = provider.text("Person").unwrap();
    assert!(stored.contains("key=\""));
    assert!(stored.contains("<surname>Bucher</surname>"));

    // upsert and delete key on the attribute-placed identity
    people.save_on_submit(&peter).unwrap();
    assert_eq!(people.load_all().unwrap().len(), 1);
    people.delete_on_submit(&peter.id).unwrap();
    assert!(people.load_all().unwrap().is_empty());
}

#[test]
fn file_provider_persists_across_contexts() {
    let dir = tempfile::tempdir().unwrap();

    {
        let ctx = Context::builder()
            .provider(FileProvider::new(dir.path(), "xml").unwrap())
            .build();
        let people = ctx.repository::<Person, Ulid>().unwrap();
        people.save_on_submit(&person(5, "Peter")).unwrap();
        people.submit_changes().unwrap();
    }

    assert!(dir.path().join("Person.xml").exists());

    let ctx = Context::builder()
        .provider(FileProvider::new(dir.path(), "xml").unwrap())
        .build();
    let people = ctx.repository::<Person, Ulid>().unwrap();

    assert_eq!(people.load_all().unwrap()[0].first_name, "Peter");
}

#[test]
fn json_serializer_round_trips_through_the_provider() {
    let provider = Arc::new(MemoryProvider::new());

    {
        let ctx = Context::builder()
            .provider_handle(Arc::clone(&provider) as Arc<dyn Provider>)
            .serializer(JsonSerializer::new())
            .build();
        let people = ctx.repository::<Person, Ulid>().unwrap();
        people.save_on_submit(&person(6, "Peter")).unwrap();
        people.submit_changes().unwrap();
    }

    // the stored text is well-formed JSON
    let stored = provider.text("Person").unwrap();
    serde_json::from_str::<serde_json::Value>(&stored).unwrap();

    let ctx = Context::builder()
        .provider_handle(Arc::clone(&provider) as Arc<dyn Provider>)
        .serializer(JsonSerializer::new())
        .build();
    let people = ctx.repository::<Person, Ulid>().unwrap();

    assert_eq!(people.load_all().unwrap()[0].first_name, "Peter");
}

#[test]
fn delegate_provider_bridges_custom_storage() {
    let store: Arc<Mutex<HashMap<String, String>>> = Arc::new(Mutex::new(HashMap::new()));

    let make_provider = |store: &Arc<Mutex<HashMap<String, String>>>| {
        let load_store = Arc::clone(store);
        let save_store = Arc::clone(store);

        DelegateProvider::new(
            move |entity_name| {
                load_store
                    .lock()
                    .unwrap()
                    .get(entity_name)
                    .cloned()
                    .unwrap_or_default()
            },
            move |entity_name, text| {
                save_store
                    .lock()
                    .unwrap()
                    .insert(entity_name.to_string(), text.to_string());
            },
        )
    };

    {
        let ctx = Context::builder().provider(make_provider(&store)).build();
        let people = ctx.repository::<Person, Ulid>().unwrap();
        people.save_on_submit(&person(7, "Golo")).unwrap();
        people.submit_changes().unwrap();
    }

    assert!(store.lock().unwrap().contains_key("Person"));

    let ctx = Context::builder().provider(make_provider(&store)).build();
    let people = ctx.repository::<Person, Ulid>().unwrap();
    assert_eq!(people.load_all().unwrap()[0].first_name, "Golo");
}

#[test]
fn dropping_a_context_commits_pending_changes() {
    let provider = Arc::new(MemoryProvider::new());

    {
        let ctx = Context::builder()
            .provider_handle(Arc::clone(&provider) as Arc<dyn Provider>)
            .build();
        let people = ctx.repository::<Person, Ulid>().unwrap();
        people.save_on_submit(&person(8, "Peter")).unwrap();
        // no submit_changes: the drop commits
    }

    assert!(provider.text("Person").unwrap().contains("Peter"));
}

#[test]
fn enum_scalars_degrade_to_their_default_on_bad_input() {
    let provider = Arc::new(MemoryProvider::seeded(
        "Article",
        "<root><Article>\
            <id>01BX5ZZKBKACTAV9WEVGEMMVRY</id>\
            <title>hello</title>\
            <status>Nonsense</status>\
        </Article></root>",
    ));

    let ctx = Context::builder()
        .provider_handle(Arc::clone(&provider) as Arc<dyn Provider>)
        .build();
    let articles = ctx.repository::<Article, Ulid>().unwrap();

    let all = articles.load_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, Status::Draft);
    assert_eq!(all[0].title, "hello");

    // a valid status round-trips
    let mut article = all[0].clone();
    article.status = Status::Published;
    articles.save_on_submit(&article).unwrap();
    assert_eq!(
        articles.load(&article.id).unwrap().status,
        Status::Published
    );
}
