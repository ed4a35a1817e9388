//! SQLite listing store round trips

use std::sync::Arc;

use chrono::NaiveDate;
use listing_harvest::{InsertOutcome, Listing, ListingStore, SharedStore, SqliteListingStore};
use tempfile::TempDir;

async fn open_store(dir: &TempDir) -> SqliteListingStore {
    SqliteListingStore::open(&dir.path().join("db").join("listings.sqlite"))
        .await
        .expect("open sqlite store")
}

fn sample() -> Listing {
    let mut listing = Listing::new("https://catalog.test/autosusados/detalle/1");
    listing.brand = Some("Mercedes".into());
    listing.model = Some("Benz B200".into());
    listing.year = Some(2013);
    listing.passengers = Some(5);
    listing.doors = Some(4);
    listing.price_colones = Some(8_075_500);
    listing.price_dollars = Some(15_500);
    listing.mileage_km = Some(93_000);
    listing.engine_displacement = Some("1600".into());
    listing.taxes_paid = Some(true);
    listing.negotiable = Some(false);
    listing.date_entered = NaiveDate::from_ymd_opt(2024, 8, 1);
    listing
}

#[tokio::test]
async fn test_insert_and_fetch_preserves_every_field() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let listing = sample();

    store.insert(&listing).await.unwrap();

    assert!(store.exists(&listing.url).await.unwrap());
    assert!(!store.exists("https://catalog.test/otro").await.unwrap());
    assert_eq!(store.fetch(&listing.url).await.unwrap(), Some(listing.clone()));
    assert_eq!(store.list_all_urls().await.unwrap(), vec![listing.url.clone()]);
    assert_eq!(store.list_unexited_urls().await.unwrap(), vec![listing.url]);
    store.close().await;
}

#[tokio::test]
async fn test_exit_date_is_set_once() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let listing = sample();
    store.insert(&listing).await.unwrap();

    let first = NaiveDate::from_ymd_opt(2024, 9, 10).unwrap();
    let later = NaiveDate::from_ymd_opt(2024, 10, 2).unwrap();

    assert!(store.mark_exited(&listing.url, first).await.unwrap());
    assert!(!store.mark_exited(&listing.url, later).await.unwrap());

    let stored = store.fetch(&listing.url).await.unwrap().unwrap();
    assert_eq!(stored.date_exited, Some(first));
    assert!(store.list_unexited_urls().await.unwrap().is_empty());
    assert_eq!(store.list_all_urls().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_mark_unknown_url_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let date = NaiveDate::from_ymd_opt(2024, 9, 10).unwrap();
    assert!(!store.mark_exited("https://catalog.test/nunca", date).await.unwrap());
    assert!(store.list_all_urls().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let listing = sample();
    {
        let store = open_store(&dir).await;
        store.insert(&listing).await.unwrap();
        store.close().await;
    }
    let store = open_store(&dir).await;
    assert_eq!(store.fetch(&listing.url).await.unwrap(), Some(listing));
}

#[tokio::test]
async fn test_shared_store_guards_duplicate_inserts() {
    let dir = TempDir::new().unwrap();
    let store = SharedStore::new(Arc::new(open_store(&dir).await));
    let listing = sample();

    let (a, b) = tokio::join!(
        store.insert_if_absent(&listing),
        store.insert_if_absent(&listing)
    );
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, InsertOutcome::AlreadyPresent));
    assert_eq!(
        outcomes,
        vec![InsertOutcome::Inserted, InsertOutcome::AlreadyPresent]
    );
    assert_eq!(store.list_all_urls().await.unwrap().len(), 1);
}
