//! Canned CLI output captured from a switch running the NAS stack.
//!
//! Trailing whitespace is already stripped, as the command runner does.

/// `ip addr show` in the default namespace.
pub const IP_ADDR_SHOW: &str = "\
1: lo: <LOOPBACK,UP,LOWER_UP> mtu 65536 qdisc noqueue state UNKNOWN
    link/loopback 00:00:00:00:00:00 brd 00:00:00:00:00:00
    inet 127.0.0.1/8 scope host lo
       valid_lft forever preferred_lft forever
    inet6 ::1/128 scope host
       valid_lft forever preferred_lft forever
2: e101-001-0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 9100 qdisc mq state UP
    link/ether 90:b1:1c:f4:a8:01 brd ff:ff:ff:ff:ff:ff
    inet 10.1.1.1/24 brd 10.1.1.255 scope global e101-001-0
       valid_lft forever preferred_lft forever
    inet6 2001:db8::1/64 scope global
       valid_lft forever preferred_lft forever
    inet6 fe80::92b1:1cff:fef4:a801/64 scope link
       valid_lft forever preferred_lft forever
3: e101-002-0: <BROADCAST,MULTICAST> mtu 1500 qdisc noop state DOWN
    link/ether 90:b1:1c:f4:a8:02 brd ff:ff:ff:ff:ff:ff
4: e101-002-0.100@e101-002-0: <BROADCAST,MULTICAST,UP,M-DOWN> mtu 1500 state LOWERLAYERDOWN
    link/ether 90:b1:1c:f4:a8:02 brd ff:ff:ff:ff:ff:ff
";

/// `ip addr show` inside the `management` namespace.
pub const IP_ADDR_SHOW_MANAGEMENT: &str = "\
1: lo: <LOOPBACK,UP,LOWER_UP> mtu 65536 qdisc noqueue state UNKNOWN
    link/loopback 00:00:00:00:00:00 brd 00:00:00:00:00:00
    inet 127.0.0.1/8 scope host lo
       valid_lft forever preferred_lft forever
5: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc mq state UP
    link/ether 90:b1:1c:f4:a8:00 brd ff:ff:ff:ff:ff:ff
    inet 192.168.1.10/24 brd 192.168.1.255 scope global eth0
       valid_lft forever preferred_lft forever
";

/// `ip -d addr show dev mv1` for a macvlan.
pub const IP_DETAIL_MACVLAN: &str = "\
7: mv1@e101-001-0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 9100 qdisc noqueue state UP
    link/ether 00:aa:bb:cc:dd:ee brd ff:ff:ff:ff:ff:ff promiscuity 0 minmtu 68 maxmtu 9216
    macvlan mode bridge addrgenmode eui64 numtxqueues 1 numrxqueues 1
    inet 10.2.2.1/24 brd 10.2.2.255 scope global mv1
       valid_lft forever preferred_lft forever
";

/// `ip netns list` with two namespaces.
pub const NETNS_LIST: &str = "\
management (id: 1)
blue (id: 0)
";

/// `brctl show` with two bridges.
pub const BRCTL_SHOW: &str = "\
bridge name\tbridge id\t\tSTP enabled\tinterfaces
br100\t\t8000.90b11cf4a801\tno\t\te101-001-0
\t\t\t\t\t\t\te101-002-0
\t\t\t\t\t\t\tvtep100
br200\t\t8000.000000000000\tno
";

/// `brctl show br100`.
pub const BRCTL_SHOW_BR100: &str = "\
bridge name\tbridge id\t\tSTP enabled\tinterfaces
br100\t\t8000.90b11cf4a801\tno\t\te101-001-0
\t\t\t\t\t\t\te101-002-0
\t\t\t\t\t\t\tvtep100
";
