//! Network management: J1939 NAMEs and the address-to-NAME table learnt from
//! Address Claimed traffic.
pub mod address_table;
pub mod iso_name;
