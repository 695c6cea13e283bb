//! Statically declared API groups.
//!
//! Every method the facades call is listed here with the properties the
//! response rules need to know about.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: &'static str,
    /// `"result": null` is a legitimate answer.
    pub nullable: bool,
}

const fn method(name: &'static str) -> MethodDescriptor {
    MethodDescriptor {
        name,
        nullable: false,
    }
}

const fn nullable(name: &'static str) -> MethodDescriptor {
    MethodDescriptor {
        name,
        nullable: true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiDescriptor {
    pub name: &'static str,
    pub methods: &'static [MethodDescriptor],
}

impl ApiDescriptor {
    pub fn method(&self, name: &str) -> Option<&'static MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// `api.method` form used on the wire.
    pub fn qualified(&self, method: &str) -> String {
        format!("{}.{}", self.name, method)
    }
}

pub const BEEKEEPER_API: ApiDescriptor = ApiDescriptor {
    name: "beekeeper_api",
    methods: &[
        method("create_session"),
        method("close_session"),
        method("get_info"),
        method("set_timeout"),
        method("list_wallets"),
        method("list_created_wallets"),
        method("create"),
        method("open"),
        method("close"),
        method("lock"),
        method("lock_all"),
        method("unlock"),
        method("import_key"),
        method("remove_key"),
        method("get_public_keys"),
        method("sign_digest"),
        method("has_matching_private_key"),
        method("encrypt_data"),
        method("decrypt_data"),
        method("is_wallet_unlocked"),
    ],
};

pub const DATABASE_API: ApiDescriptor = ApiDescriptor {
    name: "database_api",
    methods: &[
        method("get_dynamic_global_properties"),
        method("get_config"),
        method("get_version"),
        method("find_accounts"),
    ],
};

pub const CONDENSER_API: ApiDescriptor = ApiDescriptor {
    name: "condenser_api",
    methods: &[nullable("get_block")],
};

pub const APIS: &[ApiDescriptor] = &[BEEKEEPER_API, DATABASE_API, CONDENSER_API];

/// Look up a fully qualified `api.method` name.
pub fn find_method(qualified: &str) -> Option<&'static MethodDescriptor> {
    let (api, name) = qualified.split_once('.')?;
    APIS.iter().find(|a| a.name == api)?.method(name)
}

pub fn allows_null_result(qualified: &str) -> bool {
    find_method(qualified).map(|m| m.nullable).unwrap_or(false)
}
