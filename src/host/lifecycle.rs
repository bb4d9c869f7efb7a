//! # Actor Lifecycle Manager
//!
//! Each actor host owns one [`LifecycleManager`], which constructs the wrapped user
//! instance on first use and guards it afterwards.
//!
//! ```text
//!                  first call                       class identity changed
//! Uninitialized ───────────────► Bound(identity) ─────────────────────────► Invalidated
//!       │                                                                       ▲
//!       └──────────────────── constructor failed ───────────────────────────────┘
//! ```
//!
//! Every call re-resolves the class through the module loader (imports are memoized,
//! so this is cheap). While the identity matches, the bound instance is reused. When
//! it does not, the source changed underneath a warm actor: the manager fails inside
//! the blocking initializer, which aborts the host permanently. `Invalidated` is
//! terminal; a fresh reference gets a fresh host.
//!
//! No locking is needed here: the host calls into the manager from its single task.

use crate::actor::{ClassIdentity, LiveInstance};
use crate::error::{ActorError, HarnessError, Result};
use crate::module::ModuleLoader;
use crate::runtime::Env;
use crate::host::ActorState;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of one actor host's instance.
#[derive(Debug, Clone)]
pub enum Lifecycle {
    Uninitialized,
    Bound {
        identity: ClassIdentity,
        instance: LiveInstance,
    },
    Invalidated {
        reason: String,
    },
}

pub struct LifecycleManager {
    class_name: String,
    state: ActorState,
    env: Env,
    loader: Arc<dyn ModuleLoader>,
    lifecycle: Lifecycle,
}

impl LifecycleManager {
    pub fn new(
        class_name: impl Into<String>,
        state: ActorState,
        env: Env,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            state,
            env,
            loader,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn state(&self) -> &ActorState {
        &self.state
    }

    /// Returns the live instance, constructing it on first use.
    pub async fn ensure_instance(&mut self) -> Result<LiveInstance> {
        if let Lifecycle::Invalidated { reason } = &self.lifecycle {
            return Err(HarnessError::Aborted {
                reason: reason.clone(),
            });
        }
        self.state.abort_signal().check()?;

        let path = self.loader.main_module_path()?;
        let module = self.loader.import_module(&self.env, &path).await?;
        let class = module.class(&self.class_name)?.clone();

        match &self.lifecycle {
            Lifecycle::Bound { identity, instance } if *identity == class.identity() => {
                Ok(instance.clone())
            }
            Lifecycle::Bound { identity, .. } => {
                warn!(
                    actor_id = %self.state.id(),
                    class_name = %self.class_name,
                    bound = %identity,
                    resolved = %class.identity(),
                    "Actor class changed underneath a running actor"
                );
                let stale = HarnessError::StaleSource {
                    class_name: self.class_name.clone(),
                };
                let reason = stale.to_string();
                self.lifecycle = Lifecycle::Invalidated {
                    reason: reason.clone(),
                };
                // Failing inside the blocking section is what aborts the host.
                let _ = self
                    .state
                    .block_concurrency_while(async move { Err::<(), ActorError>(reason.into()) })
                    .await;
                Err(stale)
            }
            Lifecycle::Uninitialized => {
                debug!(actor_id = %self.state.id(), class_name = %self.class_name, "Constructing instance");
                let pending = class.construct(self.state.clone(), self.env.clone());
                match self.state.block_concurrency_while(pending).await {
                    Ok(instance) => {
                        info!(
                            actor_id = %self.state.id(),
                            class_name = %self.class_name,
                            identity = %class.identity(),
                            "Instance constructed"
                        );
                        self.lifecycle = Lifecycle::Bound {
                            identity: class.identity(),
                            instance: instance.clone(),
                        };
                        Ok(instance)
                    }
                    Err(e) => {
                        self.lifecycle = Lifecycle::Invalidated {
                            reason: e.to_string(),
                        };
                        Err(e)
                    }
                }
            }
            Lifecycle::Invalidated { reason } => Err(HarnessError::Aborted {
                reason: reason.clone(),
            }),
        }
    }
}
