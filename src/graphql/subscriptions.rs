//! GraphQL subscriptions for real-time updates
//!
//! Each subscription registers a receiver on its topic at establishment and
//! yields events for the connection's lifetime. Dropping the stream (client
//! disconnect, unsubscribe, server drain) drops the receiver and removes the
//! registration; events published before registration are never replayed.

use std::sync::Arc;

use async_graphql::{Context, Subscription};
use futures::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::services::EventBus;

use super::types::{Photo, User};

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Push each photo as it is created
    async fn new_photo<'ctx>(&self, ctx: &Context<'ctx>) -> impl Stream<Item = Photo> + 'ctx {
        let bus = ctx.data_unchecked::<Arc<EventBus>>();
        let receiver = bus.photo_added.subscribe();

        BroadcastStream::new(receiver).filter_map(|result| result.ok().map(Photo::from))
    }

    /// Push each user as it is created
    async fn new_user<'ctx>(&self, ctx: &Context<'ctx>) -> impl Stream<Item = User> + 'ctx {
        let bus = ctx.data_unchecked::<Arc<EventBus>>();
        let receiver = bus.new_user.subscribe();

        BroadcastStream::new(receiver).filter_map(|result| result.ok().map(User::from))
    }
}
