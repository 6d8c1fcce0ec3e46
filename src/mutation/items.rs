use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tessera_api_types::{GeoBounds, Geolocation, Item, ItemPatch, NewItem, UploadFile};
use uuid::Uuid;

use super::Mutation;
use crate::api::{ApiContext, items};
use crate::cache::{ItemKeys, QueryCache, QueryKey, Rollback, Snapshot};
use crate::client::QueryClient;
use crate::error::ApiResult;
use crate::notify::Action;

/// Where an item's siblings are listed: the parent's children, or the
/// accessible root.
fn listing(parent: Option<Uuid>) -> QueryKey {
    match parent {
        Some(parent) => ItemKeys::single(parent).all_children(),
        None => ItemKeys::all_accessible(),
    }
}

/// Keys a newly created item shows up under.
fn creation_keys(parent: Option<Uuid>, geolocation: Option<&Geolocation>) -> Vec<QueryKey> {
    let mut keys = vec![listing(parent)];
    if let Some(point) = geolocation {
        keys.push(ItemKeys::in_bounds(&GeoBounds::around(point)));
    }
    keys
}

/// Parents of the cached items among `ids`. `None` stands for the root,
/// and for items missing from the cache.
fn cached_parents(cache: &QueryCache, ids: &[Uuid]) -> BTreeSet<Option<Uuid>> {
    ids.iter()
        .map(|id| {
            cache
                .peek::<Item>(&ItemKeys::single(*id).content())
                .and_then(|item| item.parent_id())
        })
        .collect()
}

/// Items one optimistic removal took out of a cached listing.
///
/// Rolling back puts only those items back, so removals from other
/// mutations that edited the same listing concurrently survive.
#[derive(Debug, Clone)]
pub struct ListingRemoval {
    key: QueryKey,
    /// The listing as this removal saw it; gives each item its position.
    before: Vec<Item>,
    removed: Vec<Uuid>,
}

impl ListingRemoval {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    fn reinsert(&self, list: &mut Vec<Item>) {
        for (index, item) in self.before.iter().enumerate().rev() {
            if !self.removed.contains(&item.id) || list.iter().any(|cur| cur.id == item.id) {
                continue;
            }
            // Place it before the first later neighbour still listed.
            let position = self.before[index + 1..]
                .iter()
                .find_map(|next| list.iter().position(|cur| cur.id == next.id))
                .unwrap_or(list.len());
            list.insert(position, item.clone());
        }
    }
}

impl Rollback for ListingRemoval {
    fn rollback(self, cache: &QueryCache) {
        cache.update::<Vec<Item>, _>(&self.key, |list| self.reinsert(list));
    }
}

/// Drop `ids` from every cached children list of `parents`.
fn remove_from_listings(
    cache: &QueryCache,
    parents: &BTreeSet<Option<Uuid>>,
    ids: &[Uuid],
) -> Option<Vec<ListingRemoval>> {
    let mut saved = Vec::new();
    for parent in parents.iter().flatten() {
        for snapshot in cache.snapshot_prefix::<Vec<Item>>(&ItemKeys::single(*parent).all_children()) {
            let removed: Vec<Uuid> = snapshot
                .value()
                .iter()
                .map(|item| item.id)
                .filter(|id| ids.contains(id))
                .collect();
            if removed.is_empty() {
                continue;
            }
            cache.update::<Vec<Item>, _>(snapshot.key(), |list| {
                list.retain(|item| !ids.contains(&item.id));
            });
            saved.push(ListingRemoval {
                key: snapshot.key().clone(),
                before: snapshot.value().clone(),
                removed,
            });
        }
    }
    (!saved.is_empty()).then_some(saved)
}

/// Listings an optimistic removal edits. Root listings are paged and left
/// to settle-time invalidation.
fn removal_keys(parents: &BTreeSet<Option<Uuid>>) -> Vec<QueryKey> {
    parents
        .iter()
        .flatten()
        .map(|parent| ItemKeys::single(*parent).all_children())
        .collect()
}

// ============================================================================
// Creation
// ============================================================================

pub struct PostItem {
    pub item: NewItem,
}

impl PostItem {
    pub fn new(item: NewItem) -> Self {
        Self { item }
    }
}

#[async_trait]
impl Mutation for PostItem {
    type Output = Item;
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::PostItem
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Item> {
        items::post_item(api, &self.item).await
    }

    fn on_success(&self, cache: &QueryCache, item: &Item) {
        cache.set(ItemKeys::single(item.id).content(), item.clone());
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&Item>) -> Vec<QueryKey> {
        creation_keys(self.item.parent_id, self.item.geolocation.as_ref())
    }
}

pub struct UploadFiles {
    pub parent_id: Option<Uuid>,
    pub geolocation: Option<Geolocation>,
    pub files: Vec<UploadFile>,
}

impl UploadFiles {
    pub fn new(parent_id: Option<Uuid>, files: Vec<UploadFile>) -> Self {
        Self {
            parent_id,
            geolocation: None,
            files,
        }
    }

    pub fn at(mut self, geolocation: Geolocation) -> Self {
        self.geolocation = Some(geolocation);
        self
    }
}

#[async_trait]
impl Mutation for UploadFiles {
    type Output = HashMap<Uuid, Item>;
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::UploadFiles
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Self::Output> {
        items::upload_files(api, self.parent_id, self.geolocation, &self.files).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&Self::Output>) -> Vec<QueryKey> {
        creation_keys(self.parent_id, self.geolocation.as_ref())
    }
}

// ============================================================================
// Single-item edits
// ============================================================================

pub struct EditItem {
    pub id: Uuid,
    pub patch: ItemPatch,
    parent: Option<Uuid>,
}

impl EditItem {
    pub fn new(id: Uuid, patch: ItemPatch) -> Self {
        Self {
            id,
            patch,
            parent: None,
        }
    }
}

#[async_trait]
impl Mutation for EditItem {
    type Output = Item;
    type Snapshot = Snapshot<Item>;

    fn action(&self) -> Action {
        Action::EditItem
    }

    fn prepare(&mut self, cache: &QueryCache) {
        self.parent = cached_parents(cache, &[self.id]).into_iter().flatten().next();
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.id).content()]
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Snapshot<Item>> {
        let key = ItemKeys::single(self.id).content();
        let snapshot = cache.snapshot::<Item>(&key)?;
        cache.update::<Item, _>(&key, |item| self.patch.apply_to(item));
        Some(snapshot)
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Item> {
        items::edit_item(api, self.id, &self.patch).await
    }

    fn on_success(&self, cache: &QueryCache, item: &Item) {
        cache.set(ItemKeys::single(self.id).content(), item.clone());
    }

    fn settled_keys(&self, _cache: &QueryCache, output: Option<&Item>) -> Vec<QueryKey> {
        let parent = output.and_then(Item::parent_id).or(self.parent);
        vec![ItemKeys::single(self.id).content(), listing(parent)]
    }
}

pub struct PutItemGeolocation {
    pub id: Uuid,
    pub geolocation: Geolocation,
}

#[async_trait]
impl Mutation for PutItemGeolocation {
    type Output = ();
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::PutItemGeolocation
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<()> {
        items::put_item_geolocation(api, self.id, self.geolocation).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&()>) -> Vec<QueryKey> {
        vec![
            ItemKeys::single(self.id).geolocation(),
            ItemKeys::all_geolocation(),
        ]
    }
}

pub struct DeleteItemGeolocation {
    pub id: Uuid,
}

#[async_trait]
impl Mutation for DeleteItemGeolocation {
    type Output = ();
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::DeleteItemGeolocation
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<()> {
        items::delete_item_geolocation(api, self.id).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&()>) -> Vec<QueryKey> {
        vec![
            ItemKeys::single(self.id).geolocation(),
            ItemKeys::all_geolocation(),
        ]
    }
}

// ============================================================================
// Bulk operations, one chunk of ids each
// ============================================================================

pub struct DeleteItems {
    pub ids: Vec<Uuid>,
    parents: BTreeSet<Option<Uuid>>,
}

impl DeleteItems {
    pub fn new(ids: Vec<Uuid>) -> Self {
        Self {
            ids,
            parents: BTreeSet::new(),
        }
    }
}

#[async_trait]
impl Mutation for DeleteItems {
    type Output = HashMap<Uuid, Item>;
    type Snapshot = Vec<ListingRemoval>;

    fn action(&self) -> Action {
        Action::DeleteItems
    }

    fn prepare(&mut self, cache: &QueryCache) {
        self.parents = cached_parents(cache, &self.ids);
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        removal_keys(&self.parents)
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Self::Snapshot> {
        remove_from_listings(cache, &self.parents, &self.ids)
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Self::Output> {
        items::delete_items(api, &self.ids).await
    }

    fn on_success(&self, cache: &QueryCache, _output: &Self::Output) {
        for id in &self.ids {
            cache.remove_prefix(&ItemKeys::single(*id).key());
        }
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&Self::Output>) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.parents.iter().map(|parent| listing(*parent)).collect();
        keys.push(ItemKeys::recycled());
        keys
    }

    fn defer_to_websocket(&self) -> bool {
        true
    }
}

pub struct RecycleItems {
    pub ids: Vec<Uuid>,
    parents: BTreeSet<Option<Uuid>>,
}

impl RecycleItems {
    pub fn new(ids: Vec<Uuid>) -> Self {
        Self {
            ids,
            parents: BTreeSet::new(),
        }
    }
}

#[async_trait]
impl Mutation for RecycleItems {
    type Output = HashMap<Uuid, Item>;
    type Snapshot = Vec<ListingRemoval>;

    fn action(&self) -> Action {
        Action::RecycleItems
    }

    fn prepare(&mut self, cache: &QueryCache) {
        self.parents = cached_parents(cache, &self.ids);
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        removal_keys(&self.parents)
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Self::Snapshot> {
        remove_from_listings(cache, &self.parents, &self.ids)
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Self::Output> {
        items::recycle_items(api, &self.ids).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&Self::Output>) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.parents.iter().map(|parent| listing(*parent)).collect();
        keys.push(ItemKeys::recycled());
        keys.extend(self.ids.iter().map(|id| ItemKeys::single(*id).key()));
        keys
    }

    fn defer_to_websocket(&self) -> bool {
        true
    }
}

pub struct RestoreItems {
    pub ids: Vec<Uuid>,
}

impl RestoreItems {
    pub fn new(ids: Vec<Uuid>) -> Self {
        Self { ids }
    }
}

#[async_trait]
impl Mutation for RestoreItems {
    type Output = HashMap<Uuid, Item>;
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::RestoreItems
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Self::Output> {
        items::restore_items(api, &self.ids).await
    }

    fn settled_keys(&self, cache: &QueryCache, output: Option<&Self::Output>) -> Vec<QueryKey> {
        let parents: BTreeSet<Option<Uuid>> = match output {
            Some(restored) => restored.values().map(Item::parent_id).collect(),
            None => cached_parents(cache, &self.ids),
        };
        let mut keys: Vec<QueryKey> = parents.into_iter().map(listing).collect();
        keys.push(ItemKeys::recycled());
        keys.extend(self.ids.iter().map(|id| ItemKeys::single(*id).key()));
        keys
    }

    fn defer_to_websocket(&self) -> bool {
        true
    }
}

pub struct MoveItems {
    pub ids: Vec<Uuid>,
    /// Destination folder, or the root when `None`.
    pub to: Option<Uuid>,
    parents: BTreeSet<Option<Uuid>>,
}

impl MoveItems {
    pub fn new(ids: Vec<Uuid>, to: Option<Uuid>) -> Self {
        Self {
            ids,
            to,
            parents: BTreeSet::new(),
        }
    }
}

#[async_trait]
impl Mutation for MoveItems {
    type Output = HashMap<Uuid, Item>;
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::MoveItems
    }

    fn prepare(&mut self, cache: &QueryCache) {
        self.parents = cached_parents(cache, &self.ids);
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Self::Output> {
        items::move_items(api, &self.ids, self.to).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&Self::Output>) -> Vec<QueryKey> {
        let mut parents = self.parents.clone();
        parents.insert(self.to);
        let mut keys: Vec<QueryKey> = parents.into_iter().map(listing).collect();
        // Paths changed, so every key derived from a moved item is stale.
        keys.extend(self.ids.iter().map(|id| ItemKeys::single(*id).key()));
        keys
    }

    fn defer_to_websocket(&self) -> bool {
        true
    }
}

pub struct CopyItems {
    pub ids: Vec<Uuid>,
    pub to: Option<Uuid>,
}

impl CopyItems {
    pub fn new(ids: Vec<Uuid>, to: Option<Uuid>) -> Self {
        Self { ids, to }
    }
}

#[async_trait]
impl Mutation for CopyItems {
    type Output = HashMap<Uuid, Item>;
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::CopyItems
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Self::Output> {
        items::copy_items(api, &self.ids, self.to).await
    }

    fn on_success(&self, cache: &QueryCache, copies: &Self::Output) {
        for copy in copies.values() {
            cache.set(ItemKeys::single(copy.id).content(), copy.clone());
        }
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&Self::Output>) -> Vec<QueryKey> {
        vec![listing(self.to)]
    }

    fn defer_to_websocket(&self) -> bool {
        true
    }
}

impl QueryClient {
    pub async fn delete_items(&self, ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Item>> {
        let chunks = self.mutate_chunked(ids, DeleteItems::new).await?;
        Ok(chunks.into_iter().flatten().collect())
    }

    pub async fn recycle_items(&self, ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Item>> {
        let chunks = self.mutate_chunked(ids, RecycleItems::new).await?;
        Ok(chunks.into_iter().flatten().collect())
    }

    pub async fn restore_items(&self, ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Item>> {
        let chunks = self.mutate_chunked(ids, RestoreItems::new).await?;
        Ok(chunks.into_iter().flatten().collect())
    }

    pub async fn move_items(&self, ids: &[Uuid], to: Option<Uuid>) -> ApiResult<HashMap<Uuid, Item>> {
        let chunks = self
            .mutate_chunked(ids, |chunk| MoveItems::new(chunk, to))
            .await?;
        Ok(chunks.into_iter().flatten().collect())
    }

    pub async fn copy_items(&self, ids: &[Uuid], to: Option<Uuid>) -> ApiResult<HashMap<Uuid, Item>> {
        let chunks = self
            .mutate_chunked(ids, |chunk| CopyItems::new(chunk, to))
            .await?;
        Ok(chunks.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;
    use tessera_api_types::{ItemType, build_item_path};
    use time::macros::datetime;

    use super::*;
    use crate::client::ClientConfig;
    use crate::mutation::MutationState;

    fn item(id: Uuid, parent: Option<Uuid>, name: &str) -> Item {
        let path = match parent {
            Some(parent) => build_item_path(&[parent, id]),
            None => build_item_path(&[id]),
        };
        Item {
            id,
            name: name.into(),
            display_name: None,
            description: None,
            item_type: ItemType::Folder,
            path,
            extra: serde_json::Value::Null,
            settings: serde_json::Value::Null,
            creator_id: None,
            created_at: datetime!(2024-03-01 10:00 UTC),
            updated_at: datetime!(2024-03-01 10:00 UTC),
        }
    }

    fn client(server: &MockServer) -> QueryClient {
        let host = server.base_url().parse().expect("host");
        QueryClient::new(ClientConfig::new(host).with_session("token")).expect("client")
    }

    #[test]
    fn creation_without_parent_targets_accessible_root() {
        let cache = QueryCache::default();
        let post = PostItem::new(NewItem::new("notes", ItemType::Document));
        assert_eq!(
            post.settled_keys(&cache, None),
            vec![ItemKeys::all_accessible()]
        );
    }

    #[test]
    fn move_invalidates_source_and_destination() {
        let cache = QueryCache::default();
        let (from, to, id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        cache.set(ItemKeys::single(id).content(), item(id, Some(from), "a"));

        let mut moving = MoveItems::new(vec![id], Some(to));
        moving.prepare(&cache);
        let keys = moving.settled_keys(&cache, None);
        assert!(keys.contains(&ItemKeys::single(from).all_children()));
        assert!(keys.contains(&ItemKeys::single(to).all_children()));
        assert!(keys.contains(&ItemKeys::single(id).key()));
    }

    #[tokio::test]
    async fn edit_without_cached_item_skips_optimistic_step() {
        let server = MockServer::start();
        let id = Uuid::new_v4();
        server.mock(|when, then| {
            when.method("PATCH").path(format!("/items/{id}"));
            then.status(200).json_body(json!(item(id, None, "renamed")));
        });
        let client = client(&server);

        let mut pending = client.pending(EditItem::new(
            id,
            ItemPatch {
                name: Some("renamed".into()),
                ..ItemPatch::default()
            },
        ));
        pending.begin();
        assert_eq!(pending.state(), MutationState::Pending);
        assert!(client.cache().peek::<Item>(&ItemKeys::single(id).content()).is_none());

        let edited = pending.execute().await.expect("edited");
        assert_eq!(edited.name, "renamed");
        assert_eq!(
            client
                .cache()
                .peek::<Item>(&ItemKeys::single(id).content())
                .map(|item| item.name),
            Some("renamed".to_string())
        );
    }

    #[test]
    fn overlapping_removals_roll_back_in_any_order() {
        let cache = QueryCache::default();
        let parent = Uuid::new_v4();
        let listed: Vec<Item> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| item(Uuid::new_v4(), Some(parent), name))
            .collect();
        let key = ItemKeys::single(parent).children(&Default::default());
        cache.set(key.clone(), listed.clone());
        let parents = BTreeSet::from([Some(parent)]);

        let first = remove_from_listings(&cache, &parents, &[listed[0].id, listed[2].id])
            .expect("first removal");
        let second = remove_from_listings(&cache, &parents, &[listed[1].id]).expect("second removal");
        assert_eq!(cache.peek::<Vec<Item>>(&key), Some(vec![listed[3].clone()]));

        second.rollback(&cache);
        first.rollback(&cache);
        assert_eq!(cache.peek::<Vec<Item>>(&key), Some(listed));
    }

    #[tokio::test]
    async fn failed_delete_restores_children_listing() {
        let server = MockServer::start();
        let parent = Uuid::new_v4();
        let doomed = item(Uuid::new_v4(), Some(parent), "doomed");
        let kept = item(Uuid::new_v4(), Some(parent), "kept");
        server.mock(|when, then| {
            when.method("DELETE").path("/items");
            then.status(403).body("forbidden");
        });
        let client = client(&server);
        let listing_key = ItemKeys::single(parent).children(&Default::default());
        client.cache().set(
            ItemKeys::single(doomed.id).content(),
            doomed.clone(),
        );
        client
            .cache()
            .set(listing_key.clone(), vec![doomed.clone(), kept.clone()]);

        let mut pending = client.pending(DeleteItems::new(vec![doomed.id]));
        pending.begin();
        assert_eq!(pending.state(), MutationState::OptimisticApplied);
        assert_eq!(
            client.cache().peek::<Vec<Item>>(&listing_key),
            Some(vec![kept.clone()])
        );

        pending.execute().await.expect_err("forbidden");
        assert_eq!(
            client.cache().peek::<Vec<Item>>(&listing_key),
            Some(vec![doomed, kept])
        );
        assert!(client.cache().is_invalidated(&listing_key));
    }
}
