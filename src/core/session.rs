//! 请求上下文：当前登录用户与界面语言
//!
//! 身份由上游认证网关校验后以请求头传入，服务只关心
//! "是否有登录用户" 以及 "用户 id 是什么"。

use std::{fmt, str::FromStr};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::ACCEPT_LANGUAGE, request::Parts},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::CoreError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Regular,
    Government,
    Admin,
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(Role::Regular),
            "government" => Ok(Role::Government),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::BadRequest(format!("unknown role: {other}"))),
        }
    }
}

/// 已登录的操作者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Regular,
        }
    }
}

/// 界面语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Am,
}

impl Language {
    /// 解析 `Accept-Language`，只区分阿姆哈拉语和英语
    pub fn from_accept_language(value: &str) -> Self {
        let primary = value
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if primary.starts_with("am") {
            Language::Am
        } else {
            Language::En
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::En => write!(f, "en"),
            Language::Am => write!(f, "am"),
        }
    }
}

/// 显式传入每个处理函数的上下文，替代全局的 auth/language 状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: Option<Actor>,
    pub language: Language,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(actor: Actor) -> Self {
        Self {
            actor: Some(actor),
            language: Language::En,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn current_actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// 投票、认捐、评论等写操作的统一认证入口
    pub fn require_actor(&self) -> Result<&Actor, CoreError> {
        self.actor.as_ref().ok_or(CoreError::Unauthenticated)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let language = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|h| h.to_str().ok())
            .map(Language::from_accept_language)
            .unwrap_or_default();

        let Some(raw_id) = parts.headers.get(ACTOR_ID_HEADER) else {
            return Ok(RequestContext::anonymous().with_language(language));
        };

        let id = raw_id
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| CoreError::BadRequest(format!("malformed {ACTOR_ID_HEADER} header")))?;

        let role = match parts.headers.get(ACTOR_ROLE_HEADER) {
            Some(raw) => raw
                .to_str()
                .map_err(|_| CoreError::BadRequest(format!("malformed {ACTOR_ROLE_HEADER} header")))?
                .parse::<Role>()?,
            None => Role::Regular,
        };

        Ok(RequestContext {
            actor: Some(Actor { id, role }),
            language,
        })
    }
}
