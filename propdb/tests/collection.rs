use propdb::{memory::InMemoryProperties, prelude::*, serde_json::json};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    name: String,
    age: i64,
}

fn person(name: &str, age: i64) -> Person {
    Person { name: name.to_string(), age }
}

fn validated(props: &InMemoryProperties) -> Collection<Person, InMemoryProperties> {
    CollectionBuilder::new("people")
        .validator("name", |v| v.as_str().is_some_and(|s| !s.is_empty()))
        .validator("age", |v| v.as_i64().is_some_and(|age| age >= 0))
        .open(props.clone())
        .unwrap()
}

fn sorted_pairs(collection: &Collection<Person, InMemoryProperties>) -> Vec<(RecordId, Person)> {
    let mut pairs = collection
        .find_all()
        .into_iter()
        .map(Entry::into_parts)
        .collect::<Vec<_>>();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}

#[test]
fn create_then_find_by_id_returns_the_record() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);

    let id = people.create(person("John", 20)).unwrap();
    let entry = people.find_by_id(&id).unwrap();

    assert_eq!(entry, Entry::new(id.clone(), person("John", 20)));
    assert_eq!(id.len(), 16);
}

#[test]
fn invalid_create_reports_every_field_and_changes_nothing() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people.create(person("John", 20)).unwrap();
    let before = props.get_property("people").unwrap();

    let err = people.create(person("", -1)).unwrap_err();

    assert_eq!(
        err,
        StoreError::ValidationFailed {
            index: None,
            fields: vec!["name".to_string(), "age".to_string()],
        }
    );
    assert_eq!(people.len(), 1);
    assert_eq!(props.get_property("people").unwrap(), before);
}

#[test]
fn create_many_is_all_or_nothing() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);

    let err = people
        .create_many(vec![person("A", 1), person("B", -5), person("C", 3)])
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::ValidationFailed { index: Some(1), fields: vec!["age".to_string()] }
    );
    assert!(people.is_empty());
    assert_eq!(props.get_property("people").unwrap(), None);

    let ids = people
        .create_many(vec![person("A", 1), person("B", 2)])
        .unwrap();

    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(people.len(), 2);
}

#[test]
fn update_merges_partial_fields() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    let id = people.create(person("John", 20)).unwrap();

    people.update(&id, json!({ "age": 21 })).unwrap();

    assert_eq!(people.find_by_id(&id).unwrap().record, person("John", 21));
}

#[test]
fn update_of_missing_id_is_not_found() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people.create(person("John", 20)).unwrap();

    let err = people.update("ffffffffffffffff", json!({ "age": 1 })).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DocumentNotFound);
    assert_eq!(people.find_all()[0].record, person("John", 20));
}

#[test]
fn invalid_update_leaves_record_unchanged() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    let id = people.create(person("John", 20)).unwrap();

    let err = people.update(&id, json!({ "age": -3 })).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(people.find_by_id(&id).unwrap().record, person("John", 20));
}

#[test]
fn update_many_rolls_back_every_target() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    let ids = people
        .create_many(vec![person("A", 1), person("B", 2), person("C", 3)])
        .unwrap();
    let before = sorted_pairs(&people);

    let err = people
        .update_many(vec![
            (ids[0].clone(), json!({ "age": 10 })),
            (ids[1].clone(), json!({ "age": -1 })),
            (ids[2].clone(), json!({ "age": 30 })),
        ])
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::ValidationFailed { index: Some(1), fields: vec!["age".to_string()] }
    );
    assert_eq!(sorted_pairs(&people), before);

    let err = people
        .update_many(vec![
            (ids[0].to_string(), json!({ "age": 10 })),
            ("0000000000000000".to_string(), json!({ "age": 11 })),
        ])
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DocumentNotFound);
    assert_eq!(sorted_pairs(&people), before);

    people
        .update_many(vec![(&ids[0], json!({ "age": 10 })), (&ids[2], json!({ "name": "Cy" }))])
        .unwrap();

    assert_eq!(people.find_by_id(&ids[0]).unwrap().record, person("A", 10));
    assert_eq!(people.find_by_id(&ids[2]).unwrap().record, person("Cy", 3));
}

#[test]
fn delete_removes_and_missing_delete_errors() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    let id = people.create(person("John", 20)).unwrap();
    let other = people.create(person("Amy", 30)).unwrap();

    people.delete(&id).unwrap();

    assert_eq!(people.find_by_id(&id).unwrap_err().kind(), ErrorKind::DocumentNotFound);
    assert_eq!(people.delete(&id).unwrap_err().kind(), ErrorKind::DocumentNotFound);
    assert_eq!(people.ids(), vec![other]);
}

#[test]
fn delete_many_checks_every_id_first() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    let ids = people
        .create_many(vec![person("A", 1), person("B", 2), person("C", 3)])
        .unwrap();

    let err = people
        .delete_many([ids[0].as_str(), "0000000000000000"])
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DocumentNotFound);
    assert_eq!(people.len(), 3);

    people.delete_many([&ids[0], &ids[2], &ids[0]]).unwrap();

    assert_eq!(people.ids(), vec![ids[1].clone()]);
}

#[test]
fn failed_write_restores_memory_to_persisted_state() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    let id = people.create(person("John", 20)).unwrap();
    let other = people.create(person("Bea", 25)).unwrap();
    let before = sorted_pairs(&people);
    let replacement = json!([["00000000000000a1", { "name": "Zed", "age": 1 }]]).to_string();

    props.fail_writes(true);

    assert_eq!(people.create(person("Amy", 30)).unwrap_err().kind(), ErrorKind::StorageWrite);
    assert_eq!(people.update(&id, json!({ "age": 99 })).unwrap_err().kind(), ErrorKind::StorageWrite);
    assert_eq!(
        people
            .update_many([(&id, json!({ "age": 41 })), (&other, json!({ "name": "Bo" }))])
            .unwrap_err()
            .kind(),
        ErrorKind::StorageWrite
    );
    assert_eq!(people.delete_many([&id, &other]).unwrap_err().kind(), ErrorKind::StorageWrite);
    assert_eq!(people.import(&replacement).unwrap_err().kind(), ErrorKind::StorageWrite);
    assert_eq!(people.clear().unwrap_err().kind(), ErrorKind::StorageWrite);
    assert_eq!(sorted_pairs(&people), before);
    assert_eq!(people.find_by_id(&id).unwrap().record, person("John", 20));

    props.fail_writes(false);
    let reopened = validated(&props);
    assert_eq!(sorted_pairs(&reopened), sorted_pairs(&people));
}

#[test]
fn find_one_and_find_many_follow_insertion_order() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people
        .create_many(vec![person("A", 40), person("B", 10), person("C", 50)])
        .unwrap();

    let first_over_30 = people.find_one(|p| p.age > 30).unwrap();
    assert_eq!(first_over_30.record.name, "A");

    let over_30 = people
        .find_many(|p| p.age > 30)
        .into_iter()
        .map(|e| e.record.name)
        .collect::<Vec<_>>();
    assert_eq!(over_30, vec!["A", "C"]);

    assert!(people.find_many(|p| p.age > 100).is_empty());
    assert_eq!(people.find_one(|p| p.age > 100).unwrap_err().kind(), ErrorKind::DocumentNotFound);
    assert_eq!(people.count(|p| p.age >= 10), 3);
}

#[test]
fn find_like_matches_substrings_ignoring_case() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people.create_many(vec![person("John", 20), person("Amy", 31)]).unwrap();

    let names = |entries: Vec<Entry<Person>>| {
        entries.into_iter().map(|e| e.record.name).collect::<Vec<_>>()
    };

    assert_eq!(names(people.find_like("jo", Some(&["name"][..]))), vec!["John"]);
    assert_eq!(names(people.find_like("JO", None)), vec!["John"]);
    assert_eq!(names(people.find_like("3", None)), vec!["Amy"]);
    assert!(people.find_like("jo", Some(&["age"][..])).is_empty());
}

#[test]
fn find_like_skips_fields_without_string_form() {
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Tagged {
        label: String,
        tags: Vec<String>,
        note: Option<String>,
    }

    let props = InMemoryProperties::new();
    let mut tagged = Collection::<Tagged, _>::open("tagged", props).unwrap();
    tagged
        .create(Tagged { label: "x".into(), tags: vec!["rust".into()], note: None })
        .unwrap();

    assert!(tagged.find_like("rust", None).is_empty());
    assert!(tagged.find_like("rust", Some(&["tags", "note"][..])).is_empty());
    assert_eq!(tagged.find_like("X", None).len(), 1);
}

#[test]
fn query_filters_sorts_and_limits() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people
        .create_many(vec![person("a", 17), person("b", 20), person("c", 30), person("d", 25)])
        .unwrap();

    let result = people
        .query(
            &Query::builder()
                .condition(Filter::gt("age", 18))
                .sort("age", SortDirection::Desc)
                .limit(2)
                .build(),
        )
        .unwrap();

    let ages = result.iter().map(|e| e.record.age).collect::<Vec<_>>();
    assert_eq!(ages, vec![30, 25]);
}

#[test]
fn query_from_json_uses_operator_symbols() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people
        .create_many(vec![person("a", 17), person("b", 20), person("c", 30), person("d", 25)])
        .unwrap();

    let query: Query = propdb::serde_json::from_value(json!({
        "conditions": [{ "field": "age", "operator": ">", "value": 18 }],
        "sort": [{ "field": "age", "direction": "desc" }],
        "limit": 2
    }))
    .unwrap();

    let ages = people
        .query(&query)
        .unwrap()
        .into_iter()
        .map(|e| e.record.age)
        .collect::<Vec<_>>();
    assert_eq!(ages, vec![30, 25]);
}

#[test]
fn query_sort_keys_fall_through_and_stay_stable() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people
        .create_many(vec![
            person("bob", 30),
            person("amy", 30),
            person("cat", 20),
            person("amy", 20),
            person("amy", 30),
        ])
        .unwrap();
    let ids = people.ids();

    let result = people
        .query(
            &Query::builder()
                .sort("age", SortDirection::Desc)
                .sort("name", SortDirection::Asc)
                .build(),
        )
        .unwrap();

    let order = result.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
    assert_eq!(order, vec![ids[1].clone(), ids[4].clone(), ids[0].clone(), ids[3].clone(), ids[2].clone()]);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Member {
    age: Option<i64>,
}

fn sorted_ages(members: &Collection<Member, InMemoryProperties>, direction: SortDirection) -> Vec<Option<i64>> {
    members
        .query(&Query::builder().sort("age", direction).build())
        .unwrap()
        .into_iter()
        .map(|entry| entry.record.age)
        .collect()
}

#[test]
fn query_sorts_optional_fields_with_absent_values_last() {
    let props = InMemoryProperties::new();
    let mut members = Collection::<Member, _>::open("members", props.clone()).unwrap();
    members
        .create_many([Some(3), None, Some(1)].map(|age| Member { age }))
        .unwrap();

    assert_eq!(sorted_ages(&members, SortDirection::Asc), vec![Some(1), Some(3), None]);
    assert_eq!(sorted_ages(&members, SortDirection::Desc), vec![Some(3), Some(1), None]);

    members.clear().unwrap();
    members
        .create_many((0..200).map(|n| Member { age: (n % 3 != 0).then_some((n * 53) % 97) }))
        .unwrap();

    let ages = sorted_ages(&members, SortDirection::Asc);
    let present = ages.iter().take_while(|age| age.is_some()).flatten().copied().collect::<Vec<_>>();

    assert_eq!(present.len(), 133);
    assert!(present.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(ages[present.len()..].iter().all(Option::is_none));
}

#[test]
fn query_conditions_are_conjunctive_and_string_ops_ignore_case() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people
        .create_many(vec![person("Johnny", 20), person("John", 40), person("Joanna", 25)])
        .unwrap();

    let result = people
        .query(
            &Query::builder()
                .condition(Filter::starts_with("name", "JOHN"))
                .condition(Filter::lte("age", 30))
                .build(),
        )
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].record.name, "Johnny");

    let ends = people
        .query(&Query::builder().condition(Filter::ends_with("name", "NA")).build())
        .unwrap();
    assert_eq!(ends[0].record.name, "Joanna");

    let not_forty = people
        .query(&Query::builder().filter("age", Operator::Ne, 40).build())
        .unwrap();
    assert_eq!(not_forty.len(), 2);

    let contains = people
        .query(&Query::builder().condition(Filter::contains("age", "5")).build())
        .unwrap();
    assert_eq!(contains[0].record.name, "Joanna");
}

#[test]
fn query_rejects_negative_limit_and_accepts_zero() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people.create(person("A", 1)).unwrap();

    let err = people.query(&Query::builder().limit(-1).build()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidQuery);

    assert!(people.query(&Query::builder().limit(0).build()).unwrap().is_empty());
    assert_eq!(people.query(&Query::new()).unwrap().len(), 1);
}

#[test]
fn export_clear_import_round_trips() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people
        .create_many(vec![person("A", 1), person("B", 2), person("C", 3)])
        .unwrap();
    let before = sorted_pairs(&people);

    let exported = people.export().unwrap();
    people.clear().unwrap();
    assert!(people.is_empty());
    assert_eq!(props.get_property("people").unwrap().as_deref(), Some("[]"));

    people.import(&exported).unwrap();

    assert_eq!(sorted_pairs(&people), before);
    assert_eq!(sorted_pairs(&validated(&props)), before);
}

#[test]
fn rejected_import_leaves_collection_untouched() {
    let props = InMemoryProperties::new();
    let mut people = validated(&props);
    people.create(person("A", 1)).unwrap();
    let before = sorted_pairs(&people);

    let payload = json!([
        ["00000000000000a1", { "name": "B", "age": 2 }],
        ["00000000000000a2", { "name": "C", "age": -2 }],
    ])
    .to_string();

    let err = people.import(&payload).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Import);
    assert_eq!(
        err.rejected_entry(),
        Some(&RejectedEntry { index: 1, id: "00000000000000a2".into(), fields: vec!["age".into()] })
    );
    assert_eq!(sorted_pairs(&people), before);

    let upper = json!([["00000000000000AA", { "name": "D", "age": 4 }]]).to_string();
    let err = people.import(&upper).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Import);
    assert_eq!(sorted_pairs(&people), before);

    let err = people.import("{}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Import);
    assert_eq!(sorted_pairs(&people), before);
}

#[test]
fn open_loads_persisted_state_and_rejects_invalid_entries() {
    let props = InMemoryProperties::new();
    let id = {
        let mut people = validated(&props);
        people.create(person("John", 20)).unwrap()
    };

    let reopened = validated(&props);
    assert_eq!(reopened.find_by_id(&id).unwrap().record, person("John", 20));

    let corrupt = InMemoryProperties::builder()
        .property("people", json!([["00000000000000a1", { "name": "", "age": 3 }]]).to_string())
        .build()
        .unwrap();

    let err = CollectionBuilder::new("people")
        .validator("name", |v| v.as_str().is_some_and(|s| !s.is_empty()))
        .open::<Person, _>(corrupt)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Initialization);
    assert_eq!(err.rejected_entry().map(|entry| entry.fields.clone()), Some(vec!["name".to_string()]));
}

#[test]
fn record_store_shares_one_property_store() {
    let store = RecordStore::new(InMemoryProperties::new()).with_prefix("app.");

    let mut people = store.collection::<Person>("people").unwrap();
    people.create(person("A", 1)).unwrap();

    let mut teams = store
        .collection_with::<Person>("teams", Validators::new().rule("age", |v| v.is_i64()))
        .unwrap();
    teams.create(person("T", 2)).unwrap();

    store.properties().set_property("app.theme", "dark").unwrap();
    store.properties().set_property("app.counts", "[1, 2]").unwrap();
    store.properties().set_property("unrelated", "[]").unwrap();

    assert_eq!(store.collection_names().unwrap(), vec!["people", "teams"]);

    let unprefixed = RecordStore::new(InMemoryProperties::new());
    unprefixed.properties().set_property("settings", "{\"dark\": true}").unwrap();
    let mut notes = unprefixed.collection::<Person>("notes").unwrap();
    notes.create(person("N", 5)).unwrap();
    assert_eq!(unprefixed.collection_names().unwrap(), vec!["notes"]);
    assert!(store.properties().get_property("app.people").unwrap().is_some());

    store.drop_collection("teams").unwrap();
    assert_eq!(store.collection_names().unwrap(), vec!["people"]);

    let err = store.collection::<Person>("a-very-long-collection").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCollectionName);
}

proptest! {
    #[test]
    fn generated_ids_are_unique_hex(count in 1usize..64) {
        let props = InMemoryProperties::new();
        let mut people = validated(&props);

        let ids = people
            .create_many((0..count).map(|n| person("p", n as i64)))
            .unwrap();
        let unique = ids.iter().collect::<HashSet<_>>();

        prop_assert_eq!(unique.len(), count);
        prop_assert!(ids.iter().all(|id| id.len() == 16 && id.bytes().all(|b| b.is_ascii_hexdigit())));
    }

    #[test]
    fn export_import_restores_mapping(ages in proptest::collection::vec(0i64..1000, 0..20)) {
        let props = InMemoryProperties::new();
        let mut people = validated(&props);
        people
            .create_many(ages.iter().map(|&age| person("p", age)))
            .unwrap();
        let before = sorted_pairs(&people);

        let exported = people.export().unwrap();
        people.clear().unwrap();
        people.import(&exported).unwrap();

        prop_assert_eq!(sorted_pairs(&people), before);
    }
}
