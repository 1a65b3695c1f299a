//! # Market Hub
//!
//! 双语（英语/阿姆哈拉语）产品市场的服务端核心：
//! - 投票聚合：每个用户对每个产品最多一张有效票，支持撤销与改票
//! - 筹款进度：认捐只追加，累计金额按认捐记录重新汇总，进度限制在 0-100
//! - 产品目录、评论与真实的星级分布
//!
//! 分层结构：`app`（领域模型、服务、处理器）、`core`（错误、配置、
//! 请求上下文、中间件）、`infrastructure`（日志、记录存储、数据库）。

pub mod app;
pub mod core;
pub mod infrastructure;
