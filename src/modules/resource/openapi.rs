//! OpenAPI fragment shared by every resource module.

use serde_json::{json, Value};

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn entity_body(schema: &str) -> Value {
    json!({
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

fn ok_entity(description: &str, schema: &str) -> Value {
    let mut response = entity_body(schema);
    response["description"] = json!(description);
    response
}

/// Paths for the collection and item endpoints of one resource, plus the
/// entity schema under `components.schemas.{schema_name}`.
pub fn resource_fragment(tag: &str, schema_name: &str, schema: Value) -> Value {
    let id_param = json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    }]);
    let list_params = json!([
        { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 0 } },
        { "name": "size", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
        { "name": "sort", "in": "query", "schema": { "type": "string" }, "example": "id,asc" }
    ]);

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": format!("List {tag}"),
                    "tags": [tag],
                    "parameters": list_params,
                    "responses": {
                        "200": {
                            "description": "One page of matching entities",
                            "headers": {
                                "x-total-count": { "schema": { "type": "integer" } }
                            },
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": format!("#/components/schemas/{schema_name}") }
                                    }
                                }
                            }
                        },
                        "400": error_response("Invalid paging, sort or filter")
                    }
                },
                "post": {
                    "summary": format!("Create {schema_name}"),
                    "tags": [tag],
                    "requestBody": entity_body(schema_name),
                    "responses": {
                        "201": ok_entity("Created", schema_name),
                        "400": error_response("Entity already has an id")
                    }
                }
            },
            "/count": {
                "get": {
                    "summary": format!("Count {tag}"),
                    "tags": [tag],
                    "responses": {
                        "200": {
                            "description": "Number of matching entities",
                            "content": { "application/json": { "schema": { "type": "integer" } } }
                        }
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": format!("{tag} health check"),
                    "tags": [tag],
                    "responses": { "200": { "description": "OK" } }
                }
            },
            "/{id}": {
                "get": {
                    "summary": format!("Get {schema_name}"),
                    "tags": [tag],
                    "parameters": id_param.clone(),
                    "responses": {
                        "200": ok_entity("Found", schema_name),
                        "404": error_response("Not found")
                    }
                },
                "put": {
                    "summary": format!("Replace {schema_name}"),
                    "tags": [tag],
                    "parameters": id_param.clone(),
                    "requestBody": entity_body(schema_name),
                    "responses": {
                        "200": ok_entity("Updated", schema_name),
                        "400": error_response("Missing, mismatched or unknown id")
                    }
                },
                "patch": {
                    "summary": format!("Partially update {schema_name}"),
                    "tags": [tag],
                    "parameters": id_param.clone(),
                    "requestBody": {
                        "content": {
                            "application/merge-patch+json": {
                                "schema": { "$ref": format!("#/components/schemas/{schema_name}") }
                            }
                        }
                    },
                    "responses": {
                        "200": ok_entity("Updated", schema_name),
                        "400": error_response("Missing, mismatched or unknown id")
                    }
                },
                "delete": {
                    "summary": format!("Delete {schema_name}"),
                    "tags": [tag],
                    "parameters": id_param,
                    "responses": { "204": { "description": "Deleted" } }
                }
            }
        },
        "components": {
            "schemas": { schema_name: schema }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_covers_collection_and_item() {
        let fragment = resource_fragment("Books", "Book", json!({ "type": "object" }));
        assert!(fragment["paths"]["/"]["get"].is_object());
        assert!(fragment["paths"]["/{id}"]["patch"].is_object());
        assert_eq!(fragment["components"]["schemas"]["Book"]["type"], "object");
    }
}
