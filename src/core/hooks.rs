use crate::settings::Settings;

/// An ordered list of handlers run against a mutable context. Handlers fire
/// in ascending priority order; handlers sharing a priority fire in
/// registration order.
pub struct HookPipeline<Ctx> {
    handlers: Vec<(u32, Box<dyn Fn(&mut Ctx) + Send + Sync>)>,
}

impl<Ctx> HookPipeline<Ctx> {
    pub fn new() -> Self {
        HookPipeline { handlers: Vec::new() }
    }

    pub fn register<F>(&mut self, priority: u32, handler: F)
    where
        F: Fn(&mut Ctx) + Send + Sync + 'static,
    {
        let at = self
            .handlers
            .partition_point(|(existing, _)| *existing <= priority);
        self.handlers.insert(at, (priority, Box::new(handler)));
    }

    pub fn run(&self, ctx: &mut Ctx) {
        for (_, handler) in &self.handlers {
            handler(ctx);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<Ctx> Default for HookPipeline<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

/// Application-level observers. Request-scoped pipelines (the toolbar) are
/// built per page load; these two live for the life of the process.
pub struct AdminHooks {
    request_start: HookPipeline<String>,
    settings_save: HookPipeline<Settings>,
}

impl AdminHooks {
    pub fn new() -> Self {
        AdminHooks {
            request_start: HookPipeline::new(),
            settings_save: HookPipeline::new(),
        }
    }

    pub fn register_on_request_start<F>(&mut self, priority: u32, handler: F)
    where
        F: Fn(&mut String) + Send + Sync + 'static,
    {
        self.request_start.register(priority, handler);
    }

    pub fn register_on_settings_save<F>(&mut self, priority: u32, handler: F)
    where
        F: Fn(&mut Settings) + Send + Sync + 'static,
    {
        self.settings_save.register(priority, handler);
    }

    pub fn run_request_start(&self, path: &str) {
        let mut path = path.to_string();
        self.request_start.run(&mut path);
    }

    pub fn run_settings_save(&self, settings: Settings) {
        let mut settings = settings;
        self.settings_save.run(&mut settings);
    }
}

impl Default for AdminHooks {
    fn default() -> Self {
        let mut hooks = Self::new();
        hooks.register_on_request_start(10, |path| {
            tracing::debug!("admin page load: {}", path);
        });
        hooks.register_on_settings_save(10, |settings| {
            tracing::info!(
                "settings saved: show_in_toolbar={} refresh_interval={}s",
                settings.show_in_toolbar,
                settings.refresh_interval_seconds
            );
        });
        hooks
    }
}
