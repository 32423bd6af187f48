/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! Cadence Proxy Macro Library
//!
//! This library provides the [`proxy_message`] attribute, which turns a unit
//! struct into a concrete proxy message type:
//!
//! ```ignore
//! /// Registers a new domain.
//! #[proxy_message(request = DomainRegisterReply)]
//! pub struct DomainRegisterRequest;
//!
//! /// Answers [`DomainRegisterRequest`].
//! #[proxy_message(reply)]
//! pub struct DomainRegisterReply;
//! ```
//!
//! The struct name must match a `MessageType` variant. Typed property
//! accessors are written by hand in an ordinary `impl` block next to the
//! struct.

use proc_macro::TokenStream;

use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::{parse_macro_input, Fields, Ident, ItemStruct};

fn has_derive(input: &ItemStruct, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(trait_name) {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// Which base a message is composed from.
enum MessageKind {
    /// A request, with the type of the reply it expects.
    Request(Ident),
    Reply,
}

/// Configuration options parsed from `#[proxy_message(...)]` attributes.
#[derive(Default)]
struct MessageConfig {
    kind: Option<MessageKind>,
}

impl MessageConfig {
    fn parse(&mut self, meta: &ParseNestedMeta) -> syn::Result<()> {
        if self.kind.is_some() {
            return Err(meta.error("expected exactly one of `request = ReplyType` or `reply`"));
        }
        if meta.path.is_ident("request") {
            let reply_type: Ident = meta.value()?.parse()?;
            self.kind = Some(MessageKind::Request(reply_type));
            Ok(())
        } else if meta.path.is_ident("reply") {
            self.kind = Some(MessageKind::Reply);
            Ok(())
        } else {
            Err(meta.error("unsupported proxy_message property"))
        }
    }
}

/// Turns a unit struct into a request or reply message type.
///
/// # Usage
///
/// ```ignore
/// #[proxy_message(request = HeartbeatReply)]
/// pub struct HeartbeatRequest;
///
/// #[proxy_message(reply)]
/// pub struct HeartbeatReply;
/// ```
///
/// This expands to:
/// - a struct wrapping a `ProxyRequest` or `ProxyReply`, tagged with the
///   `MessageType` variant of the same name
/// - `#[derive(Clone, Debug, PartialEq)]` (only traits not already present)
/// - `new()` and `Default`
/// - `ProxyMessage` and `HasRequestId`, plus `HasReplyType` for requests or
///   `HasError` and `into_result()` for replies
/// - a compile-time assertion that the type is `Send + Sync + 'static`
#[proc_macro_attribute]
pub fn proxy_message(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut config = MessageConfig::default();
    let parser = syn::meta::parser(|meta| config.parse(&meta));
    parse_macro_input!(attr with parser);

    let input = parse_macro_input!(item as ItemStruct);

    let Some(kind) = config.kind else {
        return syn::Error::new_spanned(
            &input.ident,
            "missing `request = ReplyType` or `reply` in #[proxy_message]",
        )
        .to_compile_error()
        .into();
    };

    if !matches!(input.fields, Fields::Unit) || !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input,
            "#[proxy_message] expects a unit struct without generics",
        )
        .to_compile_error()
        .into();
    }

    TokenStream::from(expand(&input, &kind))
}

fn expand(input: &ItemStruct, kind: &MessageKind) -> TokenStream2 {
    let attrs = &input.attrs;
    let vis = &input.vis;
    let name = &input.ident;

    let derives = {
        let mut traits = Vec::new();
        for trait_name in ["Clone", "Debug", "PartialEq"] {
            if !has_derive(input, trait_name) {
                let ident = format_ident!("{}", trait_name);
                traits.push(quote!(#ident));
            }
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let (base, construct, kind_impls) = match kind {
        MessageKind::Request(reply_type) => (
            quote!(::cadence_proxy::ProxyRequest),
            quote! {
                ::cadence_proxy::ProxyRequest::new(
                    ::cadence_proxy::MessageType::#name,
                    ::cadence_proxy::MessageType::#reply_type,
                )
            },
            quote! {
                impl ::cadence_proxy::HasReplyType for #name {
                    fn reply_type(&self) -> ::cadence_proxy::MessageType {
                        ::cadence_proxy::HasReplyType::reply_type(&self.inner)
                    }
                }
            },
        ),
        MessageKind::Reply => (
            quote!(::cadence_proxy::ProxyReply),
            quote!(::cadence_proxy::ProxyReply::new(::cadence_proxy::MessageType::#name)),
            quote! {
                impl #name {
                    /// Returns the reply, or `ProxyError::Remote` when it carries an error.
                    pub fn into_result(self) -> ::std::result::Result<Self, ::cadence_proxy::ProxyError> {
                        ::cadence_proxy::HasError::check(&self)?;
                        ::std::result::Result::Ok(self)
                    }
                }

                impl ::cadence_proxy::HasError for #name {
                    fn error(&self) -> ::std::result::Result<
                        ::std::option::Option<::cadence_proxy::ErrorEnvelope>,
                        ::cadence_proxy::ProxyError,
                    > {
                        ::cadence_proxy::HasError::error(&self.inner)
                    }

                    fn set_error(&mut self, error: ::std::option::Option<&::cadence_proxy::ErrorEnvelope>) {
                        ::cadence_proxy::HasError::set_error(&mut self.inner, error);
                    }
                }
            },
        ),
    };

    let probes = match kind {
        MessageKind::Request(_) => quote! {
            fn as_reply_type(&self) -> ::std::option::Option<&dyn ::cadence_proxy::HasReplyType> {
                ::std::option::Option::Some(self)
            }
        },
        MessageKind::Reply => quote! {
            fn as_error(&self) -> ::std::option::Option<&dyn ::cadence_proxy::HasError> {
                ::std::option::Option::Some(self)
            }

            fn as_error_mut(&mut self) -> ::std::option::Option<&mut dyn ::cadence_proxy::HasError> {
                ::std::option::Option::Some(self)
            }
        },
    };

    let assert_ident = format_ident!("_AssertProxyMessage_{}", name);

    quote! {
        #(#attrs)*
        #derives
        #vis struct #name {
            inner: #base,
        }

        impl #name {
            #[must_use]
            pub fn new() -> Self {
                Self { inner: #construct }
            }
        }

        impl ::std::default::Default for #name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::cadence_proxy::ProxyMessage for #name {
            fn envelope(&self) -> &::cadence_proxy::MessageEnvelope {
                ::cadence_proxy::ProxyMessage::envelope(&self.inner)
            }

            fn envelope_mut(&mut self) -> &mut ::cadence_proxy::MessageEnvelope {
                ::cadence_proxy::ProxyMessage::envelope_mut(&mut self.inner)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any + ::std::marker::Send> {
                self
            }

            fn as_request_id(&self) -> ::std::option::Option<&dyn ::cadence_proxy::HasRequestId> {
                ::std::option::Option::Some(self)
            }

            fn as_request_id_mut(&mut self) -> ::std::option::Option<&mut dyn ::cadence_proxy::HasRequestId> {
                ::std::option::Option::Some(self)
            }

            #probes
        }

        impl ::cadence_proxy::HasRequestId for #name {
            fn request_id(&self) -> i64 {
                ::cadence_proxy::HasRequestId::request_id(&self.inner)
            }

            fn set_request_id(&mut self, request_id: i64) {
                ::cadence_proxy::HasRequestId::set_request_id(&mut self.inner, request_id);
            }
        }

        #kind_impls

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case)]
        const _: () = {
            fn #assert_ident() {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name>();
            }
        };
    }
}
