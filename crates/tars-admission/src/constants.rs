pub const TARS_GROUP: &str = "k8s.tars.io";
pub const TARS_GROUP_VERSION_V1BETA1: &str = "k8s.tars.io/v1beta1";
pub const TARS_GROUP_VERSION_V1BETA2: &str = "k8s.tars.io/v1beta2";
pub const TARS_GROUP_VERSION_V1BETA3: &str = "k8s.tars.io/v1beta3";

pub const TSERVER_KIND: &str = "TServer";
pub const TCONFIG_KIND: &str = "TConfig";
pub const TTREE_KIND: &str = "TTree";
pub const TACCOUNT_KIND: &str = "TAccount";
pub const TIMAGE_KIND: &str = "TImage";
pub const TTEMPLATE_KIND: &str = "TTemplate";
pub const TFRAMEWORK_CONFIG_KIND: &str = "TFrameworkConfig";
pub const STATEFULSET_KIND: &str = "StatefulSet";
pub const DAEMONSET_KIND: &str = "DaemonSet";
pub const SERVICE_KIND: &str = "Service";

pub const DEFAULT_CONTROLLER_SERVICE_ACCOUNT: &str =
    "system:serviceaccount:tars-system:tars-controller";
/// Configuring this name as the controller account turns every caller into the controller.
pub const UNLAWFUL_AND_ONLY_FOR_DEBUG_USERNAME: &str = "(^_^)";
pub const KUBERNETES_SYSTEM_ACCOUNT_PREFIX: &str = "system:serviceaccount:kube-system:";

pub const TSERVER_APP_LABEL: &str = "tars.io/ServerApp";
pub const TSERVER_NAME_LABEL: &str = "tars.io/ServerName";
pub const TSERVER_SUBTYPE_LABEL: &str = "tars.io/SubType";
pub const TSERVER_ID_LABEL: &str = "tars.io/ServerID";
pub const TEMPLATE_LABEL: &str = "tars.io/Template";
pub const PARENT_LABEL: &str = "tars.io/Parent";
pub const TCONFIG_NAME_LABEL: &str = "tars.io/ConfigName";
pub const TCONFIG_POD_SEQ_LABEL: &str = "tars.io/PodSeq";
pub const TCONFIG_ACTIVATED_LABEL: &str = "tars.io/Activated";
pub const TCONFIG_VERSION_LABEL: &str = "tars.io/Version";
pub const TCONFIG_DEACTIVATE_LABEL: &str = "tars.io/Deactivate";
pub const TCONFIG_DELETING_LABEL: &str = "tars.io/Deleting";
pub const TIMAGE_TYPE_LABEL: &str = "tars.io/ImageType";
pub const TIMAGE_SUPPORTED_LABEL_PREFIX: &str = "tars.io/Supported.";

pub const TMAX_REPLICAS_ANNOTATION: &str = "tars.io/MaxReplicas";
pub const TMIN_REPLICAS_ANNOTATION: &str = "tars.io/MinReplicas";
pub const LAST_APPLIED_CONFIGURATION_ANNOTATION: &str =
    "kubectl.kubernetes.io/last-applied-configuration";

pub const CONVERSION_ANNOTATION_1B1_1B2: &str = "tars.io/Conversion.1b11b2";
pub const CONVERSION_ANNOTATION_1B1_1B3: &str = "tars.io/Conversion.1b11b3";
pub const CONVERSION_ANNOTATION_1B2_1B3: &str = "tars.io/Conversion.1b21b3";

pub const TPOD_READINESS_GATE: &str = "tars.io/active";
pub const FIXED_TTREE_RESOURCE_NAME: &str = "tars-tree";
pub const FIXED_TFRAMEWORK_CONFIG_RESOURCE_NAME: &str = "tars-framework";

pub const NODE_SERVANT_PORT: i32 = 19385;
pub const MAX_TSERVER_NAME_LEN: usize = 59;
pub const SERVICE_IMAGE_PLACEHOLDER: &str = " ";
pub const NODE_INIT_CONTAINER_NAME: &str = "tarsnode";
pub const MASTER_POD_SEQ: &str = "m";

pub const DEFAULT_IMAGE_PULL_POLICY: &str = "Always";
pub const DEFAULT_LAUNCHER_TYPE: &str = "background";

pub const PASSWORD_PATTERN: &str = r"^[\x21-\x7e]{6,32}$";
pub const BCRYPT_HASH_COST: u32 = 6;
pub const REPLICAS_ANNOTATION_PATTERN: &str = "^[1-9]?[0-9]$";
