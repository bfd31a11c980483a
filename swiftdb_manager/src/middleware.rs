//! 请求管线中间件
//!
//! 宿主应用的请求管线抽象，请求类型 `R` 由宿主决定。
//! [`Connector`] 在请求进入处理器前确保数据库连接已建立。

use crate::manager::DbManager;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use swiftdb_core::SwiftDbError;
use thiserror::Error;
use tracing::error;

/// 管线结果
pub type PipelineResult = std::result::Result<(), PipelineError>;

/// 管线返回的 future
pub type PipelineFuture = Pin<Box<dyn Future<Output = PipelineResult> + Send>>;

/// 连接数据库失败时管线中的错误消息
pub const CONNECT_FAILURE_MESSAGE: &str = "error connecting to database";

/// 管线错误
///
/// `status` 为 HTTP 风格的状态码，完整的结构化错误保存在 `source` 中。
#[derive(Error, Debug)]
#[error("{status} {message}")]
pub struct PipelineError {
    /// 状态码
    pub status: u16,
    /// 面向调用方的消息
    pub message: String,
    /// 原始错误
    #[source]
    pub source: Option<SwiftDbError>,
}

impl PipelineError {
    /// 创建管线错误
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// 附加原始错误
    pub fn with_source(mut self, source: SwiftDbError) -> Self {
        self.source = Some(source);
        self
    }

    /// 数据库连接失败 (500)
    pub fn database(source: SwiftDbError) -> Self {
        Self::new(500, CONNECT_FAILURE_MESSAGE).with_source(source)
    }

    /// 是否为服务端错误
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// 请求处理器
pub trait Handler<R>: Send + Sync + 'static {
    /// 处理请求
    fn call(&self, req: R) -> PipelineFuture;
}

/// 用于函数指针的处理器实现
impl<R, F> Handler<R> for F
where
    F: Fn(R) -> PipelineFuture + Send + Sync + 'static,
{
    fn call(&self, req: R) -> PipelineFuture {
        self(req)
    }
}

/// 下一个处理器
///
/// 用于在中间件链中调用下一个中间件或最终处理器
pub struct Next<R> {
    inner: Arc<dyn Handler<R>>,
}

impl<R> Clone for Next<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Send + 'static> Next<R> {
    /// 创建新的 Next
    pub fn new<H>(handler: H) -> Self
    where
        H: Handler<R>,
    {
        Self {
            inner: Arc::new(handler),
        }
    }

    /// 调用下一个处理器
    pub async fn run(self, req: R) -> PipelineResult {
        self.inner.call(req).await
    }
}

/// 中间件 trait
pub trait Middleware<R>: Send + Sync + 'static {
    /// 处理请求
    ///
    /// # 参数
    /// - `req`: 请求
    /// - `next`: 下一个中间件或处理器
    fn call(&self, req: R, next: Next<R>) -> PipelineFuture;
}

/// 用于函数指针的中间件实现
impl<R, F> Middleware<R> for F
where
    F: Fn(R, Next<R>) -> PipelineFuture + Send + Sync + 'static,
{
    fn call(&self, req: R, next: Next<R>) -> PipelineFuture {
        self(req, next)
    }
}

/// 中间件栈
///
/// 管理多个中间件，按添加顺序执行
pub struct Stack<R> {
    middlewares: Vec<Arc<dyn Middleware<R>>>,
}

impl<R> Default for Stack<R> {
    fn default() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }
}

impl<R: Send + 'static> Stack<R> {
    /// 创建新的中间件栈
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加中间件
    pub fn push<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware<R>,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// 中间件数量
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// 是否没有中间件
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// 构建最终的处理器
    pub fn build<H>(&self, handler: H) -> Arc<dyn Handler<R>>
    where
        H: Handler<R>,
    {
        let mut current: Arc<dyn Handler<R>> = Arc::new(handler);

        // 反向包装，使第一个添加的中间件最外层
        for middleware in self.middlewares.iter().rev() {
            current = Arc::new(MiddlewareHandler {
                middleware: Arc::clone(middleware),
                inner: current,
            });
        }

        current
    }
}

/// 中间件包装的处理器
struct MiddlewareHandler<R> {
    middleware: Arc<dyn Middleware<R>>,
    inner: Arc<dyn Handler<R>>,
}

impl<R: Send + 'static> Handler<R> for MiddlewareHandler<R> {
    fn call(&self, req: R) -> PipelineFuture {
        let next = Next {
            inner: Arc::clone(&self.inner),
        };
        self.middleware.call(req, next)
    }
}

/// 连接中间件
///
/// 每个请求先调用管理器的 `connect`。失败时中止管线，返回
/// 状态码 500 的 [`PipelineError`]，成功时原样交给下一个处理器。
#[derive(Clone)]
pub struct Connector {
    manager: Arc<DbManager>,
}

impl Connector {
    /// 创建连接中间件
    pub fn new(manager: Arc<DbManager>) -> Self {
        Self { manager }
    }

    /// 所属管理器
    pub fn manager(&self) -> &Arc<DbManager> {
        &self.manager
    }
}

impl<R: Send + 'static> Middleware<R> for Connector {
    fn call(&self, req: R, next: Next<R>) -> PipelineFuture {
        let manager = Arc::clone(&self.manager);
        Box::pin(async move {
            if let Err(err) = manager.connect().await {
                error!(error = %err, "建立数据库连接失败，请求中止");
                return Err(PipelineError::database(err));
            }
            next.run(req).await
        })
    }
}
