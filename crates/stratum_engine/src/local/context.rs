use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use stratum_log::log_printf;
use tracing::debug;

use crate::config::{Config, Expr};
use crate::context::{ApplyOutcome, Context, ContextOpts};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::hook::{Hook, HookAction};
use crate::plan::{Action, Plan, ResourceChange};
use crate::provider::{Provider, Provisioner};
use crate::state::{Attributes, ResourceInstance, State};
use crate::value::Value;

use super::eval::Scope;

/// In-process context: walks resources in declaration order, one at a time.
pub struct LocalContext {
    config: Config,
    destroy: bool,
    variables: BTreeMap<String, Value>,
    state: State,
    providers: BTreeMap<String, Arc<dyn Provider>>,
    provisioners: BTreeMap<String, Arc<dyn Provisioner>>,
    hooks: Vec<Arc<dyn Hook>>,
    configured: bool,
    plan: Option<Plan>,
}

impl LocalContext {
    pub(crate) fn new(opts: ContextOpts, hooks: Vec<Arc<dyn Hook>>) -> Result<Self, Diagnostics> {
        let mut diags = Diagnostics::new();

        let mut names = opts.config.required_providers();
        names.extend(opts.state.resources.values().map(|r| r.provider.clone()));
        names.sort();
        names.dedup();
        let providers = opts.providers.resolve(&names).unwrap_or_else(|errors| {
            diags.extend(errors);
            BTreeMap::new()
        });

        let mut provisioners = BTreeMap::new();
        for resource in &opts.config.resources {
            for block in &resource.provisioners {
                if provisioners.contains_key(&block.kind) {
                    continue;
                }
                match opts.provisioners.get(&block.kind) {
                    Some(factory) => match factory() {
                        Ok(provisioner) => {
                            provisioners.insert(block.kind.clone(), provisioner);
                        }
                        Err(e) => diags.push(
                            Diagnostic::error(format!("Failed to instantiate provisioner {:?}", block.kind))
                                .with_detail(e.to_string())
                                .with_subject(resource.address()),
                        ),
                    },
                    None => diags.push(
                        Diagnostic::error(format!("Provisioner {:?} is not available", block.kind))
                            .with_subject(resource.address()),
                    ),
                }
            }
        }

        let variables = opts
            .config
            .variables
            .values()
            .filter_map(|decl| {
                opts.variables
                    .get(&decl.name)
                    .map(|input| input.value.clone())
                    .or_else(|| decl.default.clone())
                    .map(|value| (decl.name.clone(), value))
            })
            .collect();

        let context = Self {
            state: (*opts.state).clone(),
            config: opts.config,
            destroy: opts.destroy,
            variables,
            providers,
            provisioners,
            hooks,
            configured: false,
            plan: None,
        };
        diags.into_result(context)
    }

    /// Every expression in the configuration, with the subject it is
    /// reported under and whether it may read resource attributes.
    fn expressions(&self) -> Vec<(String, &Expr, bool)> {
        let mut exprs = Vec::new();
        for provider in self.config.providers.values() {
            for (name, expr) in &provider.attributes {
                exprs.push((format!("provider.{}.{name}", provider.name), expr, false));
            }
        }
        for resource in &self.config.resources {
            let address = resource.address();
            for (name, expr) in &resource.attributes {
                exprs.push((format!("{address}.{name}"), expr, false));
            }
            for block in &resource.provisioners {
                for (name, expr) in &block.attributes {
                    exprs.push((format!("{address}.provisioner.{}.{name}", block.kind), expr, false));
                }
            }
        }
        for output in self.config.outputs.values() {
            exprs.push((format!("output.{}", output.name), &output.value, true));
        }
        exprs
    }

    fn scope(&self) -> Scope<'_> {
        Scope::new(&self.variables, None)
    }

    fn halted(&self, check: impl Fn(&dyn Hook) -> HookAction) -> bool {
        self.hooks.iter().any(|hook| check(hook.as_ref()) == HookAction::Halt)
    }

    async fn configure(&mut self) -> Result<(), Diagnostics> {
        if self.configured {
            return Ok(());
        }
        let scope = self.scope();
        for (name, provider) in &self.providers {
            let config = match self.config.providers.get(name) {
                Some(block) => scope.eval_attributes(&block.attributes)?,
                None => Attributes::new(),
            };
            debug!(provider = %name, "Configuring provider");
            provider.configure(&config).await.map_err(|d| with_subject(d, &format!("provider.{name}")))?;
        }
        self.configured = true;
        Ok(())
    }

    fn provider(&self, name: &str, address: &str) -> Result<Arc<dyn Provider>, Diagnostics> {
        self.providers.get(name).cloned().ok_or_else(|| {
            Diagnostic::error(format!("Provider {name:?} is not available"))
                .with_subject(address)
                .into()
        })
    }

    async fn apply_change(&mut self, change: &ResourceChange) -> Result<(), Diagnostics> {
        let provider = self.provider(&change.provider, &change.address)?;
        match change.action {
            Action::NoOp => {}
            Action::Delete => {
                let Some(resource) = self.state.resource(&change.address).cloned() else {
                    return Ok(());
                };
                log_printf!("[INFO] apply: destroying {}", change.address);
                provider
                    .destroy_resource(&resource)
                    .await
                    .map_err(|d| with_subject(d, &change.address))?;
                self.state.remove_resource(&change.address);
            }
            Action::Create | Action::Update => {
                let verb = if change.action == Action::Create { "creating" } else { "updating" };
                log_printf!("[INFO] apply: {} {}", verb, change.address);
                let planned = change.after.clone().unwrap_or_default();
                let attributes = provider
                    .apply_resource(&change.resource_type, change.before.as_ref(), &planned)
                    .await
                    .map_err(|d| with_subject(d, &change.address))?;
                let instance = ResourceInstance::new(&change.resource_type, &change.name, &change.provider, attributes);
                self.state.set_resource(instance.clone());
                if change.action == Action::Create {
                    self.provision(&instance).await?;
                }
            }
        }
        Ok(())
    }

    async fn provision(&self, instance: &ResourceInstance) -> Result<(), Diagnostics> {
        let address = instance.address();
        let Some(resource) = self.config.resource(&address) else {
            return Ok(());
        };
        let scope = self.scope();
        for block in &resource.provisioners {
            let provisioner = self.provisioners.get(&block.kind).ok_or_else(|| {
                Diagnostics::from(
                    Diagnostic::error(format!("Provisioner {:?} is not available", block.kind))
                        .with_subject(address.as_str()),
                )
            })?;
            let config = scope
                .eval_attributes(&block.attributes)
                .map_err(|d| with_subject(d, &address))?;
            log_printf!("[INFO] apply: running {} provisioner on {}", block.kind, address);
            let lines = provisioner
                .provision(instance, &config)
                .await
                .map_err(|d| with_subject(d, &address))?;
            for line in &lines {
                for hook in &self.hooks {
                    hook.provision_output(&address, &block.kind, line);
                }
            }
        }
        Ok(())
    }

    fn update_outputs(&mut self, diags: &mut Diagnostics) {
        if self.destroy {
            self.state.outputs.clear();
            return;
        }
        let mut outputs = BTreeMap::new();
        let scope = Scope::new(&self.variables, Some(&self.state));
        for output in self.config.outputs.values() {
            match scope.eval(&output.value) {
                Ok(value) => {
                    outputs.insert(output.name.clone(), value);
                }
                Err(diag) => diags.push(diag.with_subject(format!("output.{}", output.name))),
            }
        }
        self.state.outputs = outputs;
    }
}

/// Attach `subject` to every diagnostic that has none.
fn with_subject(diags: Diagnostics, subject: &str) -> Diagnostics {
    diags
        .into_iter()
        .map(|d| if d.subject.is_some() { d } else { d.with_subject(subject) })
        .collect()
}

#[async_trait]
impl Context for LocalContext {
    fn validate(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for (subject, expr, outputs_allowed) in self.expressions() {
            for name in expr.variable_refs() {
                if !self.config.is_declared(name) {
                    diags.push(
                        Diagnostic::error("Reference to undeclared input variable")
                            .with_detail(format!("variable {name:?} has not been declared"))
                            .with_subject(subject.as_str()),
                    );
                }
            }
            if !outputs_allowed && expr.has_resource_refs() {
                diags.push(
                    Diagnostic::error("Resource references are only supported in output values")
                        .with_subject(subject.as_str()),
                );
            }
        }
        for decl in self.config.variables.values() {
            if !self.variables.contains_key(&decl.name) {
                diags.push(
                    Diagnostic::error("No value for required variable")
                        .with_subject(format!("var.{}", decl.name)),
                );
            }
        }
        if diags.has_errors() {
            return diags;
        }

        let scope = self.scope();
        for resource in &self.config.resources {
            let address = resource.address();
            let Some(provider) = self.providers.get(resource.provider_name()) else {
                continue;
            };
            if !provider.resource_types().contains(&resource.resource_type) {
                diags.push(
                    Diagnostic::error(format!("Invalid resource type {:?}", resource.resource_type))
                        .with_detail(format!("provider {:?} does not manage this type", resource.provider_name()))
                        .with_subject(address.as_str()),
                );
                continue;
            }
            match scope.eval_attributes(&resource.attributes) {
                Ok(attributes) => diags.extend(with_subject(
                    provider.validate_resource(&resource.resource_type, &attributes),
                    &address,
                )),
                Err(errors) => diags.extend(with_subject(errors, &address)),
            }
            for block in &resource.provisioners {
                let Some(provisioner) = self.provisioners.get(&block.kind) else {
                    continue;
                };
                match scope.eval_attributes(&block.attributes) {
                    Ok(config) => diags.extend(with_subject(provisioner.validate(&config), &address)),
                    Err(errors) => diags.extend(with_subject(errors, &address)),
                }
            }
        }
        diags
    }

    async fn refresh(&mut self) -> Result<State, Diagnostics> {
        self.configure().await?;
        log_printf!("[INFO] refresh: {} resource(s)", self.state.resources.len());

        let mut refreshed = self.state.clone();
        let mut diags = Diagnostics::new();
        for (address, resource) in &self.state.resources {
            if self.halted(|hook| hook.pre_refresh(resource)) {
                diags.push(Diagnostic::error("Refresh halted by hook").with_subject(address.as_str()));
                break;
            }
            let provider = match self.provider(&resource.provider, address) {
                Ok(provider) => provider,
                Err(errors) => {
                    diags.extend(errors);
                    continue;
                }
            };
            match provider.read_resource(resource).await {
                Ok(Some(attributes)) => {
                    let mut current = resource.clone();
                    current.attributes = attributes;
                    refreshed.set_resource(current);
                }
                Ok(None) => {
                    log_printf!("[WARN] refresh: {} no longer exists", address);
                    refreshed.remove_resource(address);
                }
                Err(errors) => diags.extend(with_subject(errors, address)),
            }
            if self.halted(|hook| hook.post_refresh(address, refreshed.resource(address))) {
                diags.push(Diagnostic::error("Refresh halted by hook").with_subject(address.as_str()));
                break;
            }
        }
        if diags.has_errors() {
            return Err(diags);
        }

        self.state = refreshed;
        self.plan = None;
        Ok(self.state.clone())
    }

    async fn plan(&mut self) -> Result<Plan, Diagnostics> {
        self.configure().await?;

        let mut changes = Vec::new();
        let mut diags = Diagnostics::new();
        if self.destroy {
            for resource in self.state.resources.values().rev() {
                changes.push(delete_change(resource));
            }
        } else {
            let scope = self.scope();
            for resource in &self.config.resources {
                let address = resource.address();
                let after = match scope.eval_attributes(&resource.attributes) {
                    Ok(after) => after,
                    Err(errors) => {
                        diags.extend(with_subject(errors, &address));
                        continue;
                    }
                };
                let before = self.state.resource(&address).map(|r| r.attributes.clone());
                let action = match &before {
                    None => Action::Create,
                    Some(prior) => {
                        let computed = self
                            .providers
                            .get(resource.provider_name())
                            .map(|p| p.computed_attributes(&resource.resource_type))
                            .unwrap_or_default();
                        if drifted(prior, &after, &computed) {
                            Action::Update
                        } else {
                            Action::NoOp
                        }
                    }
                };
                changes.push(ResourceChange {
                    address,
                    resource_type: resource.resource_type.clone(),
                    name: resource.name.clone(),
                    provider: resource.provider_name().to_string(),
                    action,
                    before,
                    after: Some(after),
                });
            }
            for (address, resource) in self.state.resources.iter().rev() {
                if self.config.resource(address).is_none() {
                    changes.push(delete_change(resource));
                }
            }
        }
        if diags.has_errors() {
            return Err(diags);
        }

        let plan = Plan {
            destroy: self.destroy,
            changes,
        };
        log_printf!("[INFO] plan: {}", plan.summary());
        self.plan = Some(plan.clone());
        Ok(plan)
    }

    async fn apply(&mut self) -> ApplyOutcome {
        let plan = match self.plan.take() {
            Some(plan) => plan,
            None => match self.plan().await {
                Ok(plan) => plan,
                Err(diagnostics) => {
                    return ApplyOutcome {
                        state: self.state.clone(),
                        diagnostics,
                    }
                }
            },
        };
        self.plan = None;

        let mut diags = Diagnostics::new();
        for change in plan.changes.iter().filter(|c| c.action != Action::NoOp) {
            if self.halted(|hook| hook.pre_apply(change)) {
                diags.push(Diagnostic::error("Apply halted by hook").with_subject(change.address.as_str()));
                break;
            }
            let result = self.apply_change(change).await;
            let post = self.halted(|hook| hook.post_apply(change, result.as_ref().err()));
            if let Err(errors) = result {
                log_printf!("[ERROR] apply: {}", errors);
                diags.extend(errors);
                break;
            }
            let updated = self.halted(|hook| hook.post_state_update(&self.state));
            if post || updated {
                diags.push(Diagnostic::error("Apply halted by hook").with_subject(change.address.as_str()));
                break;
            }
        }

        if !diags.has_errors() {
            self.update_outputs(&mut diags);
        }
        debug!(resources = self.state.resources.len(), errors = diags.has_errors(), "Apply finished");
        ApplyOutcome {
            state: self.state.clone(),
            diagnostics: diags,
        }
    }

    fn state(&self) -> &State {
        &self.state
    }
}

/// Whether the configured attributes differ from the prior ones. Null and
/// absent are the same; computed attributes only count when configured.
fn drifted(prior: &Attributes, after: &Attributes, computed: &[String]) -> bool {
    let configured_changed = after
        .iter()
        .any(|(name, value)| prior.get(name).unwrap_or(&Value::Null) != value);
    let removed = prior
        .iter()
        .any(|(name, value)| !value.is_null() && !after.contains_key(name) && !computed.contains(name));
    configured_changed || removed
}

fn delete_change(resource: &ResourceInstance) -> ResourceChange {
    ResourceChange {
        address: resource.address(),
        resource_type: resource.resource_type.clone(),
        name: resource.name.clone(),
        provider: resource.provider.clone(),
        action: Action::Delete,
        before: Some(resource.attributes.clone()),
        after: None,
    }
}
