//! Walk an image and a task through their lifecycles using the event
//! proxies and in-memory collaborators, publishing every audited step on
//! the given notifier.

use std::sync::Arc;

use beacon_core::{
    ByteStream, CoreError, Image, MemoryRepository, MemoryStore, RequestContext, StoredImage,
    Task, TaskExecutor,
};
use beacon_events::Notify;
use beacon_proxy::{ApiResult, RepositoryProxy};
use futures::stream::{self, StreamExt};
use serde_json::json;
use uuid::Uuid;

const DEMO_TENANT: &str = "demo-tenant";
const DEMO_USER: &str = "demo-user";

/// Accepts every task without doing anything.
struct AcceptAll;

#[async_trait::async_trait]
impl TaskExecutor for AcceptAll {
    async fn begin_processing(&self, task_id: &str) -> Result<(), CoreError> {
        tracing::debug!(task_id, "Demo executor accepted task");
        Ok(())
    }
}

fn payload(parts: &[&'static [u8]]) -> ByteStream {
    let chunks: Vec<Result<Vec<u8>, CoreError>> = parts.iter().map(|p| Ok(p.to_vec())).collect();
    stream::iter(chunks).boxed()
}

/// Run the walkthrough. Returns the number of bytes read back.
pub async fn run(notifier: Arc<dyn Notify>) -> ApiResult<u64> {
    let context = RequestContext::new(DEMO_TENANT, DEMO_USER).with_remote_addr("127.0.0.1");
    let store = Arc::new(MemoryStore::new());

    // -- image ---------------------------------------------------------------
    let images = RepositoryProxy::new(
        MemoryRepository::<StoredImage>::new(),
        context.clone(),
        notifier.clone(),
    );

    let mut image = Image::new(Uuid::now_v7().to_string());
    image.name = Some("demo".into());
    image.owner = Some(DEMO_TENANT.into());
    let mut image = images
        .add(images.wrap(StoredImage::new(image, store)))
        .await?;

    image
        .set_data(payload(&[b"beacon ", b"demo ", b"image"]), Some(17))
        .await?;
    let mut image = images.save(image).await?;

    let mut bytes_read = 0u64;
    let mut data = image.get_data().await?;
    while let Some(chunk) = data.next().await {
        bytes_read += chunk?.len() as u64;
    }

    image.image.tags.insert("demo".into());
    images.remove(image).await?;

    // -- task ----------------------------------------------------------------
    let tasks = RepositoryProxy::new(MemoryRepository::<Task>::new(), context, notifier);

    let task = Task::new(
        Uuid::now_v7().to_string(),
        "import",
        json!({"import_from": "memory://demo"}),
    );
    let mut task = tasks.add(tasks.wrap(task)).await?;
    task.run(&AcceptAll).await?;
    task.begin_processing().await?;
    task.succeed(Some(json!({"bytes_read": bytes_read}))).await?;
    tasks.remove(task).await?;

    tracing::info!(bytes_read, "Demo walkthrough complete");
    Ok(bytes_read)
}

#[cfg(test)]
mod tests {
    use beacon_events::testing::CapturingNotifier;

    use super::*;

    #[tokio::test]
    async fn walkthrough_publishes_every_audited_step() {
        let notifier = Arc::new(CapturingNotifier::new());

        let bytes_read = run(notifier.clone()).await.unwrap();

        assert_eq!(bytes_read, 17);
        let event_types: Vec<String> = notifier.logs().into_iter().map(|n| n.event_type).collect();
        assert_eq!(
            event_types,
            vec![
                "image.create",
                "image.prepare",
                "image.upload",
                "image.activate",
                "image.update",
                "image.send",
                "image.delete",
                "task.create",
                "task.run",
                "task.processing",
                "task.success",
                "task.delete",
            ]
        );
    }
}
