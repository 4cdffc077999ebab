use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Lit, parse_macro_input};

/// Check if a field has #[column(skip)]
fn has_column_skip(field: &syn::Field) -> syn::Result<bool> {
    let mut skip = false;
    for attr in &field.attrs {
        if attr.path().is_ident("column") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                } else if meta.input.peek(syn::Token![=]) {
                    // name = "..." is read by get_column_name
                    meta.input.parse::<syn::Token![=]>()?;
                    meta.input.parse::<Lit>()?;
                }
                Ok(())
            })?;
        }
    }
    Ok(skip)
}

/// Get custom column name from #[column(name = "...")] or None
fn get_column_name(field: &syn::Field) -> syn::Result<Option<String>> {
    for attr in &field.attrs {
        if attr.path().is_ident("column") {
            let mut name = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    meta.input.parse::<syn::Token![=]>()?;
                    match meta.input.parse::<Lit>()? {
                        Lit::Str(s) => name = Some(s.value()),
                        other => {
                            return Err(syn::Error::new_spanned(
                                other,
                                "column name must be a string literal",
                            ));
                        }
                    }
                } else if !meta.path.is_ident("skip") {
                    return Err(meta.error("expected `name = \"...\"` or `skip`"));
                }
                Ok(())
            })?;
            if name.is_some() {
                return Ok(name);
            }
        }
    }
    Ok(None)
}

/// Derive macro for Model - generates the field table plus the record
/// `Shape` and single-record `Target` implementations.
///
/// Every field type must implement `FieldValue`, and the struct must
/// implement `Default` (collection targets start from a blank record).
///
/// Attributes:
/// - `#[column(name = "...")]`: map the field to this column instead of the
///   lower-cased field name
/// - `#[column(skip)]`: leave the field out of mapping and inserts
///
/// Example:
/// ```text
/// #[derive(Debug, Default, Model)]
/// pub struct User {
///     pub id: i64,
///     #[column(name = "user_name")]
///     pub name: String,
///     #[column(skip)]
///     pub cached_avatar: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Model, attributes(column))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_model(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_model(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name = name.unraw().to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Model only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Model only supports structs",
            ));
        }
    };

    let mut descriptors = Vec::new();
    for field in fields {
        if has_column_skip(field)? {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_name = ident.unraw().to_string();
        let field_ty = &field.ty;
        let tag = match get_column_name(field)? {
            Some(column) => quote! { ::core::option::Option::Some(#column) },
            None => quote! { ::core::option::Option::None },
        };

        descriptors.push(quote! {
            ::tabula::FieldDescriptor {
                name: #field_name,
                tag: #tag,
                kind: <#field_ty as ::tabula::FieldValue>::KIND,
                get: |record: &Self| ::tabula::FieldValue::to_value(&record.#ident),
                set: |record: &mut Self, value: ::tabula::Value| {
                    if let ::core::option::Option::Some(value) =
                        <#field_ty as ::tabula::FieldValue>::from_value(value)
                    {
                        record.#ident = value;
                    }
                },
            }
        });
    }

    Ok(quote! {
        impl #impl_generics ::tabula::Model for #name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;
            const FIELDS: &'static [::tabula::FieldDescriptor<Self>] = &[
                #(#descriptors),*
            ];
        }

        impl #impl_generics ::tabula::Shape for #name #ty_generics #where_clause {
            const KIND: ::tabula::ShapeKind = ::tabula::ShapeKind::Record;

            fn blank() -> Self {
                ::core::default::Default::default()
            }

            fn signature(
                signatures: &::tabula::SignatureCache,
            ) -> ::core::option::Option<::std::sync::Arc<::tabula::ModelSignature>> {
                ::core::option::Option::Some(signatures.signature::<Self>())
            }

            fn scan(&mut self, row: ::tabula::ScannedRow<'_>) {
                row.populate(self)
            }
        }

        impl #impl_generics ::tabula::Target for #name #ty_generics #where_clause {
            fn load(
                &mut self,
                rows: ::tabula::Rows,
                signatures: &::tabula::SignatureCache,
            ) -> ::core::result::Result<(), ::tabula::StorageError> {
                ::tabula::mapper::fill_one(self, rows, signatures)
            }
        }
    })
}
