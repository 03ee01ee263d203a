use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::{
        watch::{channel as watch_channel, Receiver},
        Mutex,
    },
    time::Instant,
};

use polaris_result::{create_error, ErrorType, Result};

use crate::GateConfig;

type Settlement<V> = Option<Result<Arc<V>>>;

/// Single-flight request gate with a shared cooldown window.
///
/// One instance guards one upstream resource for the whole process, the
/// cooldown is deliberately shared across all identities since it protects a
/// shared upstream credential. State is owned by the gate itself and handed
/// to request handlers through service state, never kept as a global.
#[derive(Debug)]
pub struct RequestGate<V> {
    config: GateConfig,
    state: Arc<Mutex<State<V>>>,
}

#[derive(Debug)]
struct State<V> {
    /// Instant until which requests are rejected locally, without
    /// consulting the token provider or upstream
    cooldown_until: Option<Instant>,
    /// At most one outstanding upstream operation
    inflight: Option<Receiver<Settlement<V>>>,
}

impl<V: Send + Sync + 'static> RequestGate<V> {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(State {
                cooldown_until: None,
                inflight: None,
            })),
        }
    }

    /// Admit at most one upstream operation per burst of overlapping requests.
    ///
    /// `prepare` resolves the caller's credentials and runs for every caller
    /// that gets past the cooldown check, joiners included; `operation`
    /// performs the upstream call. Requests arriving while an operation is
    /// in flight join its outcome, every joiner receives the identical
    /// settled result. The operation itself runs on a detached task, an
    /// abandoned request never leaves the slot occupied.
    pub async fn execute<C, P, PFut, F, FFut>(&self, prepare: P, operation: F) -> Result<Arc<V>>
    where
        P: FnOnce() -> PFut,
        PFut: Future<Output = Result<C>>,
        F: FnOnce(C) -> FFut,
        FFut: Future<Output = Result<V>> + Send + 'static,
    {
        let receiver = {
            let mut state = self.state.lock().await;

            if let Some(receiver) = state.inflight.clone() {
                drop(state);
                // Joiners still resolve their own credentials, a caller
                // without a valid token never observes the shared result.
                prepare().await?;
                tracing::debug!("joining in-flight upstream operation");
                return wait_for(receiver).await;
            }

            if let Some(until) = state.cooldown_until {
                let now = Instant::now();
                if now < until {
                    let retry_after = (until - now).as_secs_f32();
                    tracing::debug!(retry_after, "local cooldown active");
                    return Err(create_error!(LocalCooldown { retry_after }));
                }
            }

            // Resolve credentials while still holding the lock so no other
            // request can claim the slot between our check and our claim.
            let context = prepare().await?;

            state.cooldown_until = Some(Instant::now() + self.config.cooldown);

            let (sender, receiver) = watch_channel(None);
            state.inflight = Some(receiver.clone());

            // Run and settle on a detached task so the slot is cleared even
            // when the requesting client disconnects mid-operation.
            let operation = operation(context);
            let shared = Arc::clone(&self.state);
            let cooldown = self.config.cooldown;
            tokio::spawn(async move {
                let value = operation.await.map(Arc::new);

                let mut state = shared.lock().await;
                state.inflight = None;

                // An upstream rate limit extends the cooldown past the
                // current instant by the upstream-dictated delay, subsequent
                // requests then fail fast without re-probing upstream.
                if let Err(error) = &value {
                    if let ErrorType::RateLimited { retry_after } = error.error_type {
                        tracing::warn!(retry_after, "upstream rate limited, extending cooldown");
                        state.cooldown_until = Some(
                            Instant::now()
                                + Duration::try_from_secs_f32(retry_after).unwrap_or(cooldown),
                        );
                    }
                }
                drop(state);

                sender.send_modify(|slot| {
                    slot.replace(value);
                });
            });

            receiver
        };

        wait_for(receiver).await
    }
}

async fn wait_for<V>(mut receiver: Receiver<Settlement<V>>) -> Result<Arc<V>> {
    receiver
        .wait_for(|value| value.is_some())
        .await
        .map_err(|_| create_error!(InternalError))
        .and_then(|settled| settled.clone().unwrap())
}
