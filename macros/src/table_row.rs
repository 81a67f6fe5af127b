//! TableRow derive macro implementation
//!
//! This module contains the implementation of the TableRow derive macro,
//! which maps struct fields to documented extract columns and generates
//! the conversion from a staged row.

use darling::{FromDeriveInput, FromField, ast};
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

/// Receiver for the struct that derives `TableRow`
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(table), supports(struct_named))]
pub(crate) struct TableRowReceiver {
    /// The struct identifier
    ident: syn::Ident,
    /// Table name from the #[table(...)] attribute
    #[darling(default)]
    name: Option<String>,
    /// The struct data with parsed fields
    data: ast::Data<(), ColumnReceiver>,
}

/// Receiver for the fields in the struct
#[derive(Debug, FromField)]
#[darling(attributes(column))]
pub(crate) struct ColumnReceiver {
    /// The field identifier
    ident: Option<syn::Ident>,
    /// Column name attribute
    #[darling(default, rename = "name")]
    column_name: Option<String>,
}

/// Process the TableRow derive macro
pub fn process_derive_table_row(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let input = parse_macro_input!(input as DeriveInput);

    // Parse with darling
    let receiver = match TableRowReceiver::from_derive_input(&input) {
        Ok(receiver) => receiver,
        Err(err) => return err.write_errors().into(),
    };

    TokenStream::from(generate_table_row_impl(&receiver))
}

/// Generate the trait implementation
pub(crate) fn generate_table_row_impl(receiver: &TableRowReceiver) -> proc_macro2::TokenStream {
    let struct_name = &receiver.ident;
    let table_name = receiver
        .name
        .clone()
        .unwrap_or_else(|| struct_name.to_string().to_uppercase());

    // Extract the fields
    let ast::Data::Struct(fields) = &receiver.data else {
        unreachable!("Darling ensures this is a struct")
    };

    let column_names: Vec<String> = fields.iter().map(column_name).collect();

    // Generate one converted initializer per field; the concrete cell
    // conversion is picked by the field's type through FromCell
    let field_inits = fields.iter().map(|field| {
        let field_ident = field.ident.as_ref().unwrap();
        let column = column_name(field);
        quote! {
            #field_ident: crate::typed::FromCell::from_cell(
                row.get(#column),
                #table_name,
                #column,
            )?
        }
    });

    quote! {
        impl crate::typed::TableRow for #struct_name {
            const TABLE: &'static str = #table_name;
            const COLUMNS: &'static [&'static str] = &[#(#column_names),*];

            fn from_row(row: &crate::row::RawRow) -> crate::error::Result<Self> {
                Ok(Self {
                    #(#field_inits),*
                })
            }
        }
    }
}

/// Column name for a field: the attribute when given, otherwise the field
/// name uppercased
fn column_name(field: &ColumnReceiver) -> String {
    field.column_name.clone().unwrap_or_else(|| {
        field
            .ident
            .as_ref()
            .map(|ident| ident.to_string().to_uppercase())
            .unwrap_or_default()
    })
}
