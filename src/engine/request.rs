use std::path::Path;

use anyhow::{Context, Result};
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client, Method, RequestBuilder,
};
use tokio::fs;
use tracing::warn;
use url::Url;

use crate::collection::{Body, BodyMode, FormParam, Request};
use crate::env::{resolve_variables, unresolved_variables, EnvMap};

pub(super) struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub builder: RequestBuilder,
}

/// Resolves variables and turns a collection request into a reqwest builder.
pub(super) async fn prepare_request(
    client: &Client,
    request: &Request,
    vars: &EnvMap,
) -> Result<PreparedRequest> {
    let method_name = request.method.to_ascii_uppercase();
    let method = Method::from_bytes(method_name.as_bytes())
        .with_context(|| format!("invalid HTTP method {}", request.method))?;

    let url = resolve_url(&request.url.raw(), vars)?;
    let mut builder = client.request(method, url.as_str());

    let mut has_content_type = false;
    for header in request.header.iter().filter(|h| !h.disabled) {
        let name = resolve_variables(&header.key, vars);
        let value = resolve_variables(header.value.as_deref().unwrap_or_default(), vars);
        has_content_type |= name.eq_ignore_ascii_case(CONTENT_TYPE.as_str());
        builder = builder.header(name, value);
    }

    if let Some(body) = &request.body {
        builder = apply_body(builder, body, vars, has_content_type).await?;
    }

    Ok(PreparedRequest {
        method: method_name,
        url: url.to_string(),
        builder,
    })
}

fn resolve_url(raw: &str, vars: &EnvMap) -> Result<Url> {
    let resolved = resolve_variables(raw, vars);
    let missing = unresolved_variables(&resolved, vars);
    if !missing.is_empty() {
        warn!("unresolved variables in {}: {}", raw, missing.join(", "));
    }

    let absolute = if resolved.contains("://") {
        resolved
    } else {
        format!("http://{resolved}")
    };
    Url::parse(&absolute).with_context(|| format!("invalid URL {absolute}"))
}

async fn apply_body(
    builder: RequestBuilder,
    body: &Body,
    vars: &EnvMap,
    has_content_type: bool,
) -> Result<RequestBuilder> {
    let builder = match body.mode() {
        Some(BodyMode::Raw) => {
            let text = resolve_variables(body.raw.as_deref().unwrap_or_default(), vars);
            let builder = if !has_content_type && body.raw_language() == Some("json") {
                builder.header(CONTENT_TYPE, "application/json")
            } else {
                builder
            };
            builder.body(text)
        }
        Some(BodyMode::Urlencoded) => {
            let pairs: Vec<(String, String)> = enabled(body.urlencoded.as_deref())
                .map(|param| {
                    (
                        resolve_variables(&param.key, vars),
                        resolve_variables(param.value.as_deref().unwrap_or_default(), vars),
                    )
                })
                .collect();
            builder.form(&pairs)
        }
        Some(BodyMode::Formdata) => builder.multipart(build_form(body, vars).await?),
        Some(BodyMode::File) => match body.file.as_ref().and_then(|file| file.src.as_deref()) {
            Some(src) => {
                let bytes = fs::read(src)
                    .await
                    .with_context(|| format!("reading request body file {src}"))?;
                builder.body(bytes)
            }
            None => builder,
        },
        Some(BodyMode::Other) | None => builder,
    };
    Ok(builder)
}

async fn build_form(body: &Body, vars: &EnvMap) -> Result<Form> {
    let mut form = Form::new();
    for param in enabled(body.formdata.as_deref()) {
        let key = resolve_variables(&param.key, vars);
        if !param.is_file() {
            let value = resolve_variables(param.value.as_deref().unwrap_or_default(), vars);
            form = form.text(key, value);
            continue;
        }

        let Some(src) = &param.src else {
            warn!("form field {key} has no file to upload");
            continue;
        };
        for path in src.paths() {
            form = form.part(key.clone(), file_part(&path).await?);
        }
    }
    Ok(form)
}

async fn file_part(path: &Path) -> Result<Part> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("reading upload file {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::bytes(bytes).file_name(file_name))
}

fn enabled(params: Option<&[FormParam]>) -> impl Iterator<Item = &FormParam> {
    params.unwrap_or_default().iter().filter(|param| !param.disabled)
}
