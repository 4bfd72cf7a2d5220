use std::sync::Arc;

use beacon_core::{isotime, RequestContext, Repository, Resource};
use beacon_events::Notify;
use chrono::Utc;
use serde_json::{json, Value};

use crate::entity::EntityProxy;
use crate::error::ApiResult;
use crate::{event_type, report_failure};

/// A repository that publishes `<kind>.create`, `<kind>.update` and
/// `<kind>.delete` for every successful mutation.
///
/// A rejected mutation publishes the same event type at error severity,
/// with the entity id and the failure text, before the classified error is
/// returned.
///
/// Reads are not audited: `get` and `list` only wrap their results so
/// later operations on them are.
pub struct RepositoryProxy<R> {
    repo: R,
    context: RequestContext,
    notifier: Arc<dyn Notify>,
}

impl<R> RepositoryProxy<R> {
    pub fn new(repo: R, context: RequestContext, notifier: Arc<dyn Notify>) -> Self {
        Self {
            repo,
            context,
            notifier,
        }
    }

    pub fn inner(&self) -> &R {
        &self.repo
    }

    /// Bind an entity to this repository's context and notifier.
    pub fn wrap<E>(&self, entity: E) -> EntityProxy<E> {
        EntityProxy::new(entity, self.context.clone(), self.notifier.clone())
    }

    pub async fn add<E>(&self, entity: EntityProxy<E>) -> ApiResult<EntityProxy<E>>
    where
        E: Resource,
        R: Repository<E>,
    {
        let entity = entity.into_inner();
        let id = entity.id();
        let added = match self.repo.add(entity).await {
            Ok(added) => added,
            Err(err) => {
                return Err(report_failure(
                    self.notifier.as_ref(),
                    &event_type::<E>("create"),
                    id,
                    err,
                )
                .await)
            }
        };
        self.notifier
            .info(&event_type::<E>("create"), added.notification_payload())
            .await?;
        Ok(self.wrap(added))
    }

    pub async fn save<E>(&self, entity: EntityProxy<E>) -> ApiResult<EntityProxy<E>>
    where
        E: Resource,
        R: Repository<E>,
    {
        let entity = entity.into_inner();
        let id = entity.id();
        let saved = match self.repo.save(entity).await {
            Ok(saved) => saved,
            Err(err) => {
                return Err(report_failure(
                    self.notifier.as_ref(),
                    &event_type::<E>("update"),
                    id,
                    err,
                )
                .await)
            }
        };
        self.notifier
            .info(&event_type::<E>("update"), saved.notification_payload())
            .await?;
        Ok(self.wrap(saved))
    }

    /// Remove the entity. The delete notification marks the snapshot
    /// deleted and stamps the deletion time.
    pub async fn remove<E>(&self, entity: EntityProxy<E>) -> ApiResult<EntityProxy<E>>
    where
        E: Resource,
        R: Repository<E>,
    {
        let entity = entity.into_inner();
        let id = entity.id();
        let removed = match self.repo.remove(entity).await {
            Ok(removed) => removed,
            Err(err) => {
                return Err(report_failure(
                    self.notifier.as_ref(),
                    &event_type::<E>("delete"),
                    id,
                    err,
                )
                .await)
            }
        };

        let mut payload = removed.notification_payload();
        if let Value::Object(fields) = &mut payload {
            fields.insert("deleted".into(), json!(true));
            fields.insert("deleted_at".into(), json!(isotime(&Utc::now())));
        }
        self.notifier
            .info(&event_type::<E>("delete"), payload)
            .await?;

        Ok(self.wrap(removed))
    }

    pub async fn get<E>(&self, id: &str) -> ApiResult<EntityProxy<E>>
    where
        E: Resource,
        R: Repository<E>,
    {
        let entity = self.repo.get(id).await?;
        Ok(self.wrap(entity))
    }

    pub async fn list<E>(&self) -> ApiResult<Vec<EntityProxy<E>>>
    where
        E: Resource,
        R: Repository<E>,
    {
        let entities = self.repo.list().await?;
        Ok(entities.into_iter().map(|e| self.wrap(e)).collect())
    }
}
